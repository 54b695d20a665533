//! The format descriptor threaded between sources, transforms, and sinks, and the
//! capability bit-set a sink/transform advertises over it.

use bitflags::bitflags;

/// The concrete sample representation a buffer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    DsdRaw,
    Dst,
    PcmI16,
    PcmI24,
    PcmI32,
    PcmF32,
    PcmF64,
}

impl Kind {
    /// Whether this kind is some flavor of multibit PCM (as opposed to 1-bit DSD or
    /// DST-compressed DSD).
    pub fn is_pcm(self) -> bool {
        matches!(self, Kind::PcmI16 | Kind::PcmI24 | Kind::PcmI32 | Kind::PcmF32 | Kind::PcmF64)
    }

    /// The sample width in bits for PCM kinds; 1 for `DsdRaw`/`Dst` since both are
    /// 1-bit-packed.
    pub fn bit_width(self) -> u16 {
        match self {
            Kind::DsdRaw | Kind::Dst => 1,
            Kind::PcmI16 => 16,
            Kind::PcmI24 => 24,
            Kind::PcmI32 | Kind::PcmF32 => 32,
            Kind::PcmF64 => 64,
        }
    }
}

/// A complete description of the audio carried by one buffer: kind, sample rate,
/// channel count, bit depth, and (for DST) frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Format {
    pub kind: Kind,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub dst_frame_rate: u16,
}

impl Format {
    pub fn dsd_raw(sample_rate: u32, channels: u16) -> Format {
        Format { kind: Kind::DsdRaw, sample_rate, channels, bits_per_sample: 1, dst_frame_rate: 0 }
    }

    pub fn dst(sample_rate: u32, channels: u16, dst_frame_rate: u16) -> Format {
        Format { kind: Kind::Dst, sample_rate, channels, bits_per_sample: 1, dst_frame_rate }
    }

    pub fn pcm(kind: Kind, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Format {
        debug_assert!(kind.is_pcm());
        Format { kind, sample_rate, channels, bits_per_sample, dst_frame_rate: 0 }
    }
}

bitflags! {
    /// Capability bits a sink or transform advertises: which input kinds it accepts
    /// and which optional side-channels it understands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const ACCEPTS_DSD          = 0b0000_0001;
        const ACCEPTS_DST          = 0b0000_0010;
        const ACCEPTS_PCM          = 0b0000_0100;
        const SUPPORTS_METADATA    = 0b0000_1000;
        const SUPPORTS_MARKERS     = 0b0001_0000;
        const SINGLE_FILE_MULTI_TRACK = 0b0010_0000;
    }
}

impl Capabilities {
    /// Whether these capabilities accept a buffer of the given `Kind`.
    pub fn accepts(self, kind: Kind) -> bool {
        match kind {
            Kind::DsdRaw => self.contains(Capabilities::ACCEPTS_DSD),
            Kind::Dst => self.contains(Capabilities::ACCEPTS_DST),
            _ if kind.is_pcm() => self.contains(Capabilities::ACCEPTS_PCM),
            _ => false,
        }
    }
}

bitflags! {
    /// Per-frame flags a source attaches to a [`crate::buffer::PipelineBuffer`]: track
    /// boundaries and stream position, independent of the frame's sample data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        const TRACK_START   = 0b0000_0001;
        const TRACK_END     = 0b0000_0010;
        const EOF           = 0b0000_0100;
        const DISCONTINUITY = 0b0000_1000;
    }
}
