//! The Humdi container format.
//!
//! Logical layout, before entropy coding:
//!
//! * the tag `Humdi`
//! * one raw byte: quality (the effective factor times 50)
//! * one raw byte: subpixel count
//! * color depth, row count and column count, each in ASCII decimal
//!   followed by one space
//! * 64 raw bytes: the quantization table, row-major
//! * the run-length body: `(count, value)` byte pairs replaying the
//!   diagonal scan of every 8x8 block
//!
//! The whole buffer is handed to the `huffman` module for storage, so
//! a Humdi file on disk is always Huffman-compressed; reading expands
//! first and parses after.

use crate::{dct,huffman};
use crate::matrix::Matrix;
use crate::pixel::Pixel;
use crate::Error;

pub const MAGIC: &[u8] = b"Humdi";

/// Diagonal traversal of one 8x8 block: anti-diagonals growing from
/// the top-left corner, then anti-diagonals shrinking toward the
/// bottom-right corner.  Every cell is visited exactly once.
fn scan_order() -> [(usize,usize);64] {
    let mut ans = [(0,0);64];
    let mut n = 0;
    for k in 0..8 {
        for l in 0..=k {
            ans[n] = (k - l,l);
            n += 1;
        }
    }
    for k in 1..8 {
        for l in 0..8-k {
            ans[n] = (7 - l,l + k);
            n += 1;
        }
    }
    ans
}

/// Run-length writer over the scanned value stream.  Runs cap at 255
/// and restart on any value change; the initial (0, 0) state lets a
/// leading zero join an implicit empty run, matching the reader.
struct RunWriter {
    last: i8,
    count: u8
}

impl RunWriter {
    fn new() -> Self {
        Self { last: 0, count: 0 }
    }
    fn push(&mut self, val: i8, out: &mut Vec<u8>) {
        if val == self.last && self.count < 255 {
            self.count += 1;
        } else {
            if self.count != 0 {
                out.push(self.count);
                out.push(self.last as u8);
            }
            self.count = 1;
            self.last = val;
        }
    }
    fn finish(self, out: &mut Vec<u8>) {
        if self.count != 0 {
            out.push(self.count);
            out.push(self.last as u8);
        }
    }
}

/// Run-length reader; yields one value per call in scan order.
struct RunReader<'a> {
    buf: &'a [u8],
    pos: usize,
    last: i8,
    remaining: u8
}

impl <'a> RunReader<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos, last: 0, remaining: 0 }
    }
    fn next(&mut self) -> Result<i8,Error> {
        if self.remaining == 0 {
            if self.pos + 1 >= self.buf.len() {
                return Err(Error::UnexpectedEnd(format!(
                    "image data ran out at position {}",self.pos)));
            }
            self.remaining = self.buf[self.pos];
            self.last = self.buf[self.pos + 1] as i8;
            if self.remaining == 0 {
                return Err(Error::OutOfRange(format!(
                    "zero run length at position {}",self.pos)));
            }
            self.pos += 2;
        }
        self.remaining -= 1;
        Ok(self.last)
    }
}

/// A picture that went, or is going, through the transform pipeline.
/// Holds the quantized coefficients between the transform and the
/// container bytes, and the reconstructed pixels after `inverse`.
pub struct HumdiFile {
    /// effective quality factor, 0..=2
    quality: u8,
    color_depth: u32,
    quantization: Matrix<u8>,
    pixels: Matrix<Pixel>,
    encoded_size: usize
}

impl HumdiFile {
    pub fn from_image(pixels: Matrix<Pixel>, color_depth: u32) -> Self {
        Self {
            quality: 1,
            color_depth,
            quantization: dct::default_table(),
            pixels,
            encoded_size: 0
        }
    }
    /// Read a stored file: expand the entropy coding, then parse the
    /// container.
    pub fn read(buf: &[u8]) -> Result<Self,Error> {
        let expanded = huffman::expand(buf)?;
        let mut ans = Self::parse(&expanded)?;
        ans.encoded_size = buf.len();
        Ok(ans)
    }
    /// The user quality setting collapses to three effective levels:
    /// 0-49 to 0, 50-99 to 1, 100 to 2.  Level 0 is rejected later by
    /// the transforms.
    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality.min(100) / 50;
    }
    pub fn quality(&self) -> u8 {
        self.quality * 50
    }
    pub fn set_quantization(&mut self, table: Matrix<u8>) -> Result<(),Error> {
        if table.rows() != 8 || table.cols() != 8 {
            return Err(Error::DimensionMismatch(format!(
                "quantization table is {}x{}, expected 8x8",table.rows(),table.cols())));
        }
        self.quantization = table;
        Ok(())
    }
    pub fn color_depth(&self) -> u32 {
        self.color_depth
    }
    pub fn encoded_size(&self) -> usize {
        self.encoded_size
    }
    pub fn pixels(&self) -> &Matrix<Pixel> {
        &self.pixels
    }
    pub fn into_pixels(self) -> Matrix<Pixel> {
        self.pixels
    }
    /// Transform the image into quantized coefficients.
    pub fn forward(&mut self) -> Result<(),Error> {
        dct::forward(&mut self.pixels,&self.quantization,self.quality)
    }
    /// Reconstruct pixel values from parsed coefficients.
    pub fn inverse(&mut self) -> Result<(),Error> {
        dct::inverse(&mut self.pixels,&self.quantization,self.quality)
    }
    fn subpixels(&self) -> Result<usize,Error> {
        match self.pixels.get(0,0) {
            Some(pixel) if pixel.len() > 0 => Ok(pixel.len()),
            _ => Err(Error::BadDataType("image with no pixel samples".to_string()))
        }
    }
    /// Serialize the container (pre-entropy-coding layout).
    pub fn to_bytes(&self) -> Result<Vec<u8>,Error> {
        let subpixels = self.subpixels()?;
        let rows = self.pixels.rows();
        let cols = self.pixels.cols();
        let mut ans: Vec<u8> = Vec::new();
        ans.extend_from_slice(MAGIC);
        ans.push(self.quality * 50);
        ans.push(subpixels as u8);
        for number in [self.color_depth as usize,rows,cols] {
            ans.extend_from_slice(number.to_string().as_bytes());
            ans.push(b' ');
        }
        for i in 0..8 {
            for j in 0..8 {
                ans.push(*self.quantization.get(i,j).unwrap());
            }
        }
        let scan = scan_order();
        let mut runs = RunWriter::new();
        for block_row in (0..rows).step_by(8) {
            for block_col in (0..cols).step_by(8) {
                for &(i,j) in scan.iter() {
                    if let Some(pixel) = self.pixels.get(block_row + i,block_col + j) {
                        for channel in 0..subpixels {
                            runs.push(pixel.get(channel) as i8,&mut ans);
                        }
                    }
                }
            }
        }
        runs.finish(&mut ans);
        Ok(ans)
    }
    /// Parse the container layout; the inverse of `to_bytes`,
    /// field for field.
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        if buf.len() < MAGIC.len() || &buf[..MAGIC.len()] != MAGIC {
            return Err(Error::BadHeader("not a Humdi stream".to_string()));
        }
        let mut pos = MAGIC.len();
        let quality_byte = next_byte(buf,&mut pos)?;
        let subpixels = next_byte(buf,&mut pos)? as usize;
        if subpixels == 0 {
            return Err(Error::BadDataType(format!(
                "subpixel count 0 at position {}",pos - 1)));
        }
        let color_depth = next_ascii_number(buf,&mut pos)? as u32;
        let rows = next_ascii_number(buf,&mut pos)?;
        let cols = next_ascii_number(buf,&mut pos)?;
        let mut quantization = Matrix::new(8,8);
        for i in 0..8 {
            for j in 0..8 {
                quantization.set(i,j,next_byte(buf,&mut pos)?);
            }
        }
        let mut pixels = Matrix::new(rows,cols);
        let scan = scan_order();
        let mut runs = RunReader::new(buf,pos);
        for block_row in (0..rows).step_by(8) {
            for block_col in (0..cols).step_by(8) {
                for &(i,j) in scan.iter() {
                    if block_row + i < rows && block_col + j < cols {
                        let mut pixel = Pixel::new(subpixels);
                        for channel in 0..subpixels {
                            pixel.set(channel,runs.next()? as f64);
                        }
                        pixels.set(block_row + i,block_col + j,pixel);
                    }
                }
            }
        }
        let mut ans = Self::from_image(pixels,color_depth);
        ans.set_quality(quality_byte);
        ans.quantization = quantization;
        Ok(ans)
    }
    /// Serialize and entropy-code the container for storage.
    pub fn compress(&mut self) -> Result<huffman::Encoded,Error> {
        let encoded = huffman::compress(&self.to_bytes()?)?;
        self.encoded_size = encoded.bytes.len();
        log::debug!("humdi: {}x{} image stored in {} bytes",
            self.pixels.rows(),self.pixels.cols(),self.encoded_size);
        Ok(encoded)
    }
}

fn next_byte(buf: &[u8], pos: &mut usize) -> Result<u8,Error> {
    let ans = *buf.get(*pos)
        .ok_or_else(|| Error::UnexpectedEnd(format!("header ended at position {}",pos)))?;
    *pos += 1;
    Ok(ans)
}

/// ASCII decimal terminated by one space.
fn next_ascii_number(buf: &[u8], pos: &mut usize) -> Result<usize,Error> {
    let mut ans: usize = 0;
    let mut seen_digit = false;
    loop {
        match next_byte(buf,pos)? {
            byte @ b'0'..=b'9' => {
                ans = ans * 10 + (byte - b'0') as usize;
                seen_digit = true;
                if ans > u32::MAX as usize {
                    return Err(Error::BadHeader(format!("number too large at position {}",*pos - 1)));
                }
            },
            b' ' if seen_digit => {
                return Ok(ans);
            },
            byte => {
                return Err(Error::BadHeader(format!(
                    "expected a decimal digit, found byte {} at position {}",byte,*pos - 1)));
            }
        }
    }
}

#[cfg(test)]
fn test_image(rows: usize, cols: usize, subpixels: usize, value: impl Fn(usize,usize,usize) -> f64) -> Matrix<Pixel> {
    let mut ans = Matrix::new(rows,cols);
    for r in 0..rows {
        for c in 0..cols {
            let mut pixel = Pixel::new(subpixels);
            for k in 0..subpixels {
                pixel.set(k,value(r,c,k));
            }
            ans.set(r,c,pixel);
        }
    }
    ans
}

#[test]
fn scan_covers_every_cell_once() {
    let scan = scan_order();
    let mut seen = [[false;8];8];
    for &(i,j) in scan.iter() {
        assert!(!seen[i][j],"cell {},{} visited twice",i,j);
        seen[i][j] = true;
    }
    assert!(seen.iter().flatten().all(|v| *v));
}

#[test]
fn scan_order_is_the_two_phase_sweep() {
    let scan = scan_order();
    assert_eq!(scan[0],(0,0));
    assert_eq!(scan[1],(1,0));
    assert_eq!(scan[2],(0,1));
    assert_eq!(scan[3],(2,0));
    assert_eq!(scan[35],(0,7));
    assert_eq!(scan[36],(7,1));
    assert_eq!(scan[63],(7,7));
}

#[test]
fn header_layout() {
    let mut file = HumdiFile::from_image(test_image(8,8,1,|_,_,_| 0.0),255);
    file.set_quality(100);
    let bytes = file.to_bytes().expect("serialization failed");
    let mut expected: Vec<u8> = b"Humdi".to_vec();
    expected.push(100);
    expected.push(1);
    expected.extend_from_slice(b"255 8 8 ");
    assert_eq!(&bytes[..expected.len()],expected.as_slice());
    assert_eq!(bytes[expected.len()],16); // first table entry
}

#[test]
fn container_round_trip() {
    let image = test_image(12,10,3,|r,c,k| ((r * 5 + c * 3 + k) % 50) as f64 - 25.0);
    let mut file = HumdiFile::from_image(image.clone(),255);
    file.set_quality(50);
    let bytes = file.to_bytes().expect("serialization failed");
    let parsed = HumdiFile::parse(&bytes).expect("parse failed");
    assert_eq!(parsed.quality(),50);
    assert_eq!(parsed.color_depth(),255);
    assert_eq!(parsed.pixels(),&image);
}

#[test]
fn long_runs_cross_the_byte_cap() {
    // 400 equal values force a (255, v) pair followed by the remainder
    let image = test_image(20,20,1,|_,_,_| 0.0);
    let file = HumdiFile::from_image(image.clone(),255);
    let bytes = file.to_bytes().expect("serialization failed");
    let tail = &bytes[bytes.len()-4..];
    assert_eq!(tail,&[255,0,145,0]);
    let parsed = HumdiFile::parse(&bytes).expect("parse failed");
    assert_eq!(parsed.pixels(),&image);
}

#[test]
fn runs_of_length_one() {
    let image = test_image(8,8,1,|r,c,_| ((r * 8 + c) % 2 * 3) as f64);
    let file = HumdiFile::from_image(image.clone(),255);
    let bytes = file.to_bytes().expect("serialization failed");
    let parsed = HumdiFile::parse(&bytes).expect("parse failed");
    assert_eq!(parsed.pixels(),&image);
}

#[test]
fn bad_magic_is_rejected() {
    assert!(matches!(HumdiFile::parse(b"Humble0 0 0 "),Err(Error::BadHeader(_))));
}

#[test]
fn zero_run_length_is_rejected() {
    let image = test_image(8,8,1,|_,_,_| 1.0);
    let file = HumdiFile::from_image(image,255);
    let mut bytes = file.to_bytes().expect("serialization failed");
    let tail = bytes.len() - 2;
    bytes[tail] = 0;
    assert!(matches!(HumdiFile::parse(&bytes),Err(Error::OutOfRange(_))));
}

#[test]
fn truncated_body_is_rejected() {
    let image = test_image(8,8,1,|r,c,_| (r + c) as f64);
    let file = HumdiFile::from_image(image,255);
    let mut bytes = file.to_bytes().expect("serialization failed");
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(HumdiFile::parse(&bytes),Err(Error::UnexpectedEnd(_))));
}

#[test]
fn pipeline_reconstructs_constant_image() {
    // DC-only blocks: no AC energy, no rounding drift
    let image = test_image(16,16,1,|_,_,_| 128.0);
    let mut file = HumdiFile::from_image(image,255);
    file.set_quality(50);
    file.forward().expect("transform failed");
    let stored = file.compress().expect("compression failed");
    assert!(file.encoded_size() > 0);
    let mut restored = HumdiFile::read(&stored.bytes).expect("read failed");
    restored.inverse().expect("transform failed");
    assert_eq!(restored.pixels().rows(),16);
    assert_eq!(restored.pixels().cols(),16);
    for pixel in restored.pixels().iter() {
        assert_eq!(pixel.get(0),128.0);
    }
}

#[test]
fn pipeline_keeps_color_within_quantization_error() {
    let image = test_image(24,16,3,|r,c,k| 100.0 + (r as f64) * 2.0 + (c as f64) + (k as f64) * 5.0);
    let mut file = HumdiFile::from_image(image.clone(),255);
    file.set_quality(100);
    file.forward().expect("transform failed");
    let stored = file.compress().expect("compression failed");
    let mut restored = HumdiFile::read(&stored.bytes).expect("read failed");
    restored.inverse().expect("transform failed");
    for r in 0..24 {
        for c in 0..16 {
            for k in 0..3 {
                let a = image.get(r,c).unwrap().get(k);
                let b = restored.pixels().get(r,c).unwrap().get(k);
                assert!((a - b).abs() <= 16.0,"drift at {},{},{}: {} vs {}",r,c,k,a,b);
            }
        }
    }
}
