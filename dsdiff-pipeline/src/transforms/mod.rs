pub mod dsd_to_pcm;
pub mod dst_decoder;
