//! Reader and writer for the netpbm family of image files, P1-P6.
//!
//! ASCII variants: P1 (bitmap), P2 (graymap), P3 (pixmap).  Binary
//! variants: P4 (bitmap, packed bits), P5 (graymap), P6 (pixmap);
//! the binary graymap and pixmap use two big-endian bytes per sample
//! when the color depth exceeds 255.  Comments starting with `#` are
//! allowed anywhere a separator is.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::matrix::Matrix;
use crate::pixel::Pixel;
use crate::Error;

#[derive(Clone,Copy,Debug,PartialEq,FromPrimitive)]
pub enum Magic {
    P1 = 1,
    P2,
    P3,
    P4,
    P5,
    P6
}

pub struct PpmFile {
    magic: Magic,
    color_depth: u32,
    pixels: Matrix<Pixel>
}

impl PpmFile {
    /// Parse a complete file buffer.
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        let mut pos: usize = 0;
        skip_separators(buf,&mut pos)?;
        if next_byte(buf,&mut pos)? != b'P' {
            return Err(Error::BadHeader("no magic number".to_string()));
        }
        let magic_digit = next_byte(buf,&mut pos)?;
        let magic = Magic::from_u8(magic_digit.wrapping_sub(b'0'))
            .ok_or_else(|| Error::BadHeader(format!("magic number was P{}",magic_digit as char)))?;
        let width = read_number(buf,&mut pos)?;
        let height = read_number(buf,&mut pos)?;
        let color_depth = match magic {
            Magic::P1 | Magic::P4 => 1,
            _ => read_number(buf,&mut pos)? as u32
        };
        if color_depth < 1 || color_depth > 65535 {
            return Err(Error::BadDataType(format!("color depth was {}",color_depth)));
        }
        let mut ans = Self {
            magic,
            color_depth,
            pixels: Matrix::new(height,width)
        };
        match magic {
            Magic::P1 => ans.read_bits_ascii(buf,&mut pos)?,
            Magic::P2 | Magic::P3 => ans.read_ascii(buf,&mut pos)?,
            Magic::P4 => ans.read_bits_binary(buf,pos)?,
            Magic::P5 | Magic::P6 => ans.read_binary(buf,pos)?
        };
        Ok(ans)
    }
    /// Wrap a pixel matrix, picking the magic number from the data:
    /// multi-sample pixels become a pixmap, depth-1 data a bitmap,
    /// anything else a graymap, always in the binary variant.
    pub fn from_matrix(pixels: Matrix<Pixel>, color_depth: u32) -> Self {
        let subpixels = match pixels.get(0,0) {
            Some(pixel) => pixel.len(),
            None => 1
        };
        let magic = if subpixels > 1 {
            Magic::P6
        } else if color_depth == 1 {
            Magic::P4
        } else {
            Magic::P5
        };
        Self { magic, color_depth, pixels }
    }
    pub fn magic(&self) -> Magic {
        self.magic
    }
    pub fn color_depth(&self) -> u32 {
        self.color_depth
    }
    /// Samples per pixel implied by the magic number.
    pub fn subpixels(&self) -> usize {
        match self.magic {
            Magic::P3 | Magic::P6 => 3,
            _ => 1
        }
    }
    pub fn pixels(&self) -> &Matrix<Pixel> {
        &self.pixels
    }
    pub fn into_pixels(self) -> Matrix<Pixel> {
        self.pixels
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans: Vec<u8> = Vec::new();
        ans.push(b'P');
        ans.push(b'0' + self.magic as u8);
        ans.push(b'\n');
        ans.extend_from_slice(format!("{} {}\n",self.pixels.cols(),self.pixels.rows()).as_bytes());
        if !matches!(self.magic,Magic::P1 | Magic::P4) {
            ans.extend_from_slice(format!("{}\n",self.color_depth).as_bytes());
        }
        match self.magic {
            Magic::P1 => self.write_bits_ascii(&mut ans),
            Magic::P2 | Magic::P3 => self.write_ascii(&mut ans),
            Magic::P4 => self.write_bits_binary(&mut ans),
            Magic::P5 | Magic::P6 => self.write_binary(&mut ans)
        };
        ans
    }

    fn read_bits_ascii(&mut self, buf: &[u8], pos: &mut usize) -> Result<(),Error> {
        let total = self.pixels.rows() * self.pixels.cols();
        for mat_pos in 0..total {
            skip_separators(buf,pos)?;
            let val = match next_byte(buf,pos) {
                Ok(b'0') => 0.0,
                Ok(b'1') => 1.0,
                Ok(byte) => return Err(Error::BadHeader(format!(
                    "bitmap cell was `{}` at position {}",byte as char,*pos - 1))),
                Err(_) => return Err(Error::UnexpectedEnd(format!(
                    "bitmap ended after {} of {} cells",mat_pos,total)))
            };
            self.pixels.set_at(mat_pos,Pixel::filled(1,val))?;
        }
        Ok(())
    }
    fn read_ascii(&mut self, buf: &[u8], pos: &mut usize) -> Result<(),Error> {
        let subpixels = self.subpixels();
        let total = self.pixels.rows() * self.pixels.cols();
        let mut pixel = Pixel::new(subpixels);
        for mat_pos in 0..total {
            for channel in 0..subpixels {
                let val = read_number(buf,pos).map_err(|e| match e {
                    Error::UnexpectedEnd(_) => Error::UnexpectedEnd(format!(
                        "image ended after {} of {} pixels",mat_pos,total)),
                    other => other
                })?;
                pixel.set(channel,val as f64);
            }
            self.pixels.set_at(mat_pos,pixel.clone())?;
        }
        Ok(())
    }
    fn read_bits_binary(&mut self, buf: &[u8], pos: usize) -> Result<(),Error> {
        // packed bits run continuously, with no padding at row ends
        let total = self.pixels.rows() * self.pixels.cols();
        for mat_pos in 0..total {
            let byte = *buf.get(pos + mat_pos / 8)
                .ok_or_else(|| Error::UnexpectedEnd(format!(
                    "bitmap ended after {} of {} cells",mat_pos,total)))?;
            let bit = (byte >> (7 - mat_pos % 8)) & 1;
            self.pixels.set_at(mat_pos,Pixel::filled(1,bit as f64))?;
        }
        Ok(())
    }
    fn read_binary(&mut self, buf: &[u8], mut pos: usize) -> Result<(),Error> {
        let subpixels = self.subpixels();
        let total = self.pixels.rows() * self.pixels.cols();
        let sample_bytes: usize = if self.color_depth > 255 { 2 } else { 1 };
        let needed = total * subpixels * sample_bytes;
        if buf.len() - pos < needed {
            return Err(Error::UnexpectedEnd(format!(
                "image body has {} bytes, needs {}",buf.len() - pos,needed)));
        }
        let mut pixel = Pixel::new(subpixels);
        for mat_pos in 0..total {
            for channel in 0..subpixels {
                let val = if sample_bytes == 2 {
                    let high = buf[pos] as u32;
                    let low = buf[pos + 1] as u32;
                    pos += 2;
                    (high << 8 | low) as f64
                } else {
                    pos += 1;
                    buf[pos - 1] as f64
                };
                pixel.set(channel,val);
            }
            self.pixels.set_at(mat_pos,pixel.clone())?;
        }
        Ok(())
    }

    fn write_bits_ascii(&self, out: &mut Vec<u8>) {
        let mut line_len = 0;
        for pixel in self.pixels.iter() {
            for channel in 0..pixel.len() {
                out.push(if pixel.get(channel) >= 1.0 { b'1' } else { b'0' });
                line_len += 1;
                if line_len >= 70 {
                    out.push(b'\n');
                    line_len = 0;
                }
            }
        }
        out.push(b'\n');
    }
    fn write_ascii(&self, out: &mut Vec<u8>) {
        let mut line_len = 0;
        for pixel in self.pixels.iter() {
            for channel in 0..pixel.len() {
                let val = pixel.get(channel).clamp(0.0,255.0) as u32;
                let token = format!("{} ",val);
                out.extend_from_slice(token.as_bytes());
                line_len += token.len();
                if line_len >= 70 {
                    out.push(b'\n');
                    line_len = 0;
                }
            }
        }
        out.push(b'\n');
    }
    fn write_bits_binary(&self, out: &mut Vec<u8>) {
        let mut buffer: u8 = 0;
        let mut bit_pos: i32 = 7;
        for pixel in self.pixels.iter() {
            for channel in 0..pixel.len() {
                if pixel.get(channel) >= 1.0 {
                    buffer |= 1 << bit_pos;
                }
                if bit_pos == 0 {
                    out.push(buffer);
                    buffer = 0;
                    bit_pos = 7;
                } else {
                    bit_pos -= 1;
                }
            }
        }
        if bit_pos != 7 {
            out.push(buffer);
        }
    }
    fn write_binary(&self, out: &mut Vec<u8>) {
        let two_bytes = self.color_depth > 255;
        for pixel in self.pixels.iter() {
            for channel in 0..pixel.len() {
                if two_bytes {
                    let val = pixel.get(channel).clamp(0.0,65535.0) as u32;
                    out.push((val >> 8) as u8);
                    out.push((val & 0xff) as u8);
                } else {
                    out.push(pixel.get(channel).clamp(0.0,255.0) as u8);
                }
            }
        }
    }
}

fn next_byte(buf: &[u8], pos: &mut usize) -> Result<u8,Error> {
    let ans = *buf.get(*pos)
        .ok_or_else(|| Error::UnexpectedEnd(format!("file ended at position {}",pos)))?;
    *pos += 1;
    Ok(ans)
}

/// Advance past whitespace and `#` comments, which run to end of line.
fn skip_separators(buf: &[u8], pos: &mut usize) -> Result<(),Error> {
    while let Some(&byte) = buf.get(*pos) {
        match byte {
            b' ' | b'\t' | b'\r' | b'\n' | 0 => {
                *pos += 1;
            },
            b'#' => {
                while next_byte(buf,pos).map_err(|_| Error::UnexpectedEnd(
                    format!("comment ran to end of file at position {}",pos)))? != b'\n' {}
            },
            _ => break
        }
    }
    Ok(())
}

/// ASCII decimal after any separators; one trailing whitespace byte is
/// consumed so binary bodies can start immediately after.
fn read_number(buf: &[u8], pos: &mut usize) -> Result<usize,Error> {
    skip_separators(buf,pos)?;
    let mut ans: usize = 0;
    let mut seen_digit = false;
    while let Some(&byte) = buf.get(*pos) {
        match byte {
            b'0'..=b'9' => {
                ans = ans * 10 + (byte - b'0') as usize;
                seen_digit = true;
                *pos += 1;
                if ans > u32::MAX as usize {
                    return Err(Error::BadHeader(format!("number too large at position {}",pos)));
                }
            },
            b' ' | b'\t' | b'\r' | b'\n' | 0 if seen_digit => {
                *pos += 1;
                return Ok(ans);
            },
            _ => {
                return Err(Error::BadHeader(format!(
                    "expected a number, found byte {} at position {}",byte,pos)));
            }
        }
    }
    if seen_digit {
        Ok(ans)
    } else {
        Err(Error::UnexpectedEnd(format!("file ended at position {}",pos)))
    }
}

#[cfg(test)]
fn grey_matrix(rows: usize, cols: usize, value: impl Fn(usize,usize) -> f64) -> Matrix<Pixel> {
    let mut ans = Matrix::new(rows,cols);
    for r in 0..rows {
        for c in 0..cols {
            ans.set(r,c,Pixel::filled(1,value(r,c)));
        }
    }
    ans
}

#[test]
fn parse_ascii_graymap() {
    let file = PpmFile::parse(b"P2\n# a comment\n3 2\n255\n0 50 100\n150 200 250\n")
        .expect("parse failed");
    assert_eq!(file.magic(),Magic::P2);
    assert_eq!(file.color_depth(),255);
    assert_eq!(file.pixels().rows(),2);
    assert_eq!(file.pixels().cols(),3);
    assert_eq!(file.pixels().get(0,1).unwrap().get(0),50.0);
    assert_eq!(file.pixels().get(1,2).unwrap().get(0),250.0);
}

#[test]
fn parse_ascii_bitmap_with_and_without_separators() {
    let spaced = PpmFile::parse(b"P1\n3 2\n0 1 1\n0 1 0\n").expect("parse failed");
    let packed = PpmFile::parse(b"P1\n3 2\n011010").expect("parse failed");
    assert_eq!(spaced.pixels(),packed.pixels());
    assert_eq!(spaced.pixels().get(0,1).unwrap().get(0),1.0);
}

#[test]
fn binary_graymap_round_trip() {
    let mat = grey_matrix(5,7,|r,c| (r * 30 + c) as f64);
    let file = PpmFile::from_matrix(mat.clone(),255);
    assert_eq!(file.magic(),Magic::P5);
    let parsed = PpmFile::parse(&file.to_bytes()).expect("parse failed");
    assert_eq!(parsed.pixels(),&mat);
}

#[test]
fn binary_pixmap_round_trip() {
    let mut mat = Matrix::new(4,3);
    for r in 0..4 {
        for c in 0..3 {
            let mut pixel = Pixel::new(3);
            for k in 0..3 {
                pixel.set(k,(r * 50 + c * 10 + k) as f64);
            }
            mat.set(r,c,pixel);
        }
    }
    let file = PpmFile::from_matrix(mat.clone(),255);
    assert_eq!(file.magic(),Magic::P6);
    let parsed = PpmFile::parse(&file.to_bytes()).expect("parse failed");
    assert_eq!(parsed.pixels(),&mat);
    assert_eq!(parsed.subpixels(),3);
}

#[test]
fn binary_bitmap_round_trip() {
    let mat = grey_matrix(3,3,|r,c| ((r + c) % 2) as f64);
    let file = PpmFile::from_matrix(mat.clone(),1);
    assert_eq!(file.magic(),Magic::P4);
    let parsed = PpmFile::parse(&file.to_bytes()).expect("parse failed");
    assert_eq!(parsed.pixels(),&mat);
}

#[test]
fn two_byte_samples_round_trip() {
    let mat = grey_matrix(2,2,|r,c| (r * 40000 + c * 300) as f64);
    let file = PpmFile::from_matrix(mat.clone(),65535);
    let parsed = PpmFile::parse(&file.to_bytes()).expect("parse failed");
    assert_eq!(parsed.color_depth(),65535);
    assert_eq!(parsed.pixels(),&mat);
}

#[test]
fn ascii_round_trip_through_writer() {
    let mat = grey_matrix(2,9,|r,c| (r * 100 + c * 11) as f64);
    let mut file = PpmFile::from_matrix(mat.clone(),255);
    file.magic = Magic::P2;
    let parsed = PpmFile::parse(&file.to_bytes()).expect("parse failed");
    assert_eq!(parsed.pixels(),&mat);
}

#[test]
fn header_errors() {
    assert!(matches!(PpmFile::parse(b"P7\n1 1\n255\n"),Err(Error::BadHeader(_))));
    assert!(matches!(PpmFile::parse(b"X2\n1 1\n255\n"),Err(Error::BadHeader(_))));
    assert!(matches!(PpmFile::parse(b"P2\n1 1\n70000\n0 "),Err(Error::BadDataType(_))));
    assert!(matches!(PpmFile::parse(b"P2\n2 2\n255\n1 2 3"),Err(Error::UnexpectedEnd(_))));
    assert!(matches!(PpmFile::parse(b"P5\n4 4\n255\nxy"),Err(Error::UnexpectedEnd(_))));
}
