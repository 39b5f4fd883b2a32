use std::io;

use auto_impl::auto_impl;
use zstd::zstd_safe;

use super::DEFAULT_COMPRESSION_LEVEL;

/// Compression scheme applied to whole blocks.
///
/// The decompressor is told the exact uncompressed size ahead of time.
#[auto_impl(&mut, Box)]
pub trait BlockCompressor {
    /// Compresses `src` into `dst`, replacing its contents
    fn compress(&mut self, src: &[u8], dst: &mut Vec<u8>) -> io::Result<()>;

    /// Decompresses `src` into `dst`, returning the number of bytes produced
    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> io::Result<usize>;
}

/// Zstandard block compression with reusable contexts
pub struct Zstandard {
    level: i32,
    cctx: zstd_safe::CCtx<'static>,
    dctx: zstd_safe::DCtx<'static>,
}
impl Zstandard {
    #[must_use]
    pub fn new(level: i32) -> Self {
        Self {
            level,
            cctx: zstd_safe::CCtx::create(),
            dctx: zstd_safe::DCtx::create(),
        }
    }

    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }
}
impl Default for Zstandard {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}
impl BlockCompressor for Zstandard {
    fn compress(&mut self, src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
        // zstd fills the spare capacity and sets the true length
        dst.clear();
        dst.reserve(zstd_safe::compress_bound(src.len()));
        self.cctx
            .compress(dst, src, self.level)
            .map_err(|e| io::Error::other(zstd_safe::get_error_name(e)))?;
        Ok(())
    }

    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> io::Result<usize> {
        self.dctx
            .decompress(dst, src)
            .map_err(|e| io::Error::other(zstd_safe::get_error_name(e)))
    }
}
