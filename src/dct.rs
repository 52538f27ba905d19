//! 8x8 discrete cosine transform and coefficient quantization.
//!
//! The image is processed in 8x8 blocks.  Cells beyond the image edge
//! read as zero on the way in and are never written on the way out.
//! Quantization scales each coefficient by `quality / table[i][j]`,
//! where the quality factor is the coarse 0/1/2 level derived from the
//! user's 0-100 setting; the inverse divides by the factor, so a zero
//! factor is rejected before either direction runs.

use crate::matrix::Matrix;
use crate::pixel::Pixel;
use crate::Error;

pub const BLOCK: usize = 8;

type Block = [[f64;BLOCK];BLOCK];

/// Standard luminance quantization table, row-major.
const LUMINANCE: [[u8;BLOCK];BLOCK] = [
    [ 16, 11, 10, 16, 24, 40, 51, 61],
    [ 12, 12, 14, 19, 26, 58, 60, 55],
    [ 14, 13, 16, 24, 40, 57, 69, 56],
    [ 14, 17, 22, 29, 51, 87, 80, 62],
    [ 18, 22, 37, 56, 68,109,103, 77],
    [ 24, 35, 55, 64, 81,104,113, 92],
    [ 49, 64, 78, 87,103,121,120,101],
    [ 72, 92, 95, 98,112,100,103, 99]
];

/// The default quantization table as a matrix.
pub fn default_table() -> Matrix<u8> {
    let mut ans = Matrix::new(BLOCK,BLOCK);
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            ans.set(i,j,LUMINANCE[i][j]);
        }
    }
    ans
}

/// The fixed cosine basis: column 0 is 1/(2*sqrt(2)), the rest is
/// 0.5*cos((2i+1)*j*pi/16).
fn basis() -> Block {
    let mut ans = [[0.0;BLOCK];BLOCK];
    let first_col = 1.0 / (2.0 * 2.0_f64.sqrt());
    for i in 0..BLOCK {
        ans[i][0] = first_col;
        for j in 1..BLOCK {
            ans[i][j] = 0.5 * ((2 * i + 1) as f64 * j as f64 * std::f64::consts::PI / 16.0).cos();
        }
    }
    ans
}

fn transpose(mat: &Block) -> Block {
    let mut ans = [[0.0;BLOCK];BLOCK];
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            ans[i][j] = mat[j][i];
        }
    }
    ans
}

fn multiply(lhs: &Block, rhs: &Block) -> Block {
    let mut ans = [[0.0;BLOCK];BLOCK];
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            let mut acc = 0.0;
            for k in 0..BLOCK {
                acc += lhs[i][k] * rhs[k][j];
            }
            ans[i][j] = acc;
        }
    }
    ans
}

/// Round half away from zero.
fn round_half_away(val: f64) -> f64 {
    if val > 0.0 {
        (val + 0.5).floor()
    } else {
        (val - 0.5).ceil()
    }
}

fn check_args(table: &Matrix<u8>, quality: u8) -> Result<(),Error> {
    if table.rows() != BLOCK || table.cols() != BLOCK {
        return Err(Error::DimensionMismatch(format!(
            "quantization table is {}x{}, expected 8x8",table.rows(),table.cols())));
    }
    if quality == 0 {
        return Err(Error::OutOfRange(
            "effective quality factor 0 cannot be inverted; use a quality of 50 or more".to_string()));
    }
    Ok(())
}

/// Transform the image in place into quantized coefficients.
pub fn forward(image: &mut Matrix<Pixel>, table: &Matrix<u8>, quality: u8) -> Result<(),Error> {
    check_args(table,quality)?;
    let trans = basis();
    let trans_t = transpose(&trans);
    let quality = quality as f64;
    let subpixels = match image.get(0,0) {
        Some(pixel) => pixel.len(),
        None => return Ok(())
    };
    for block_row in (0..image.rows()).step_by(BLOCK) {
        for block_col in (0..image.cols()).step_by(BLOCK) {
            for channel in 0..subpixels {
                let mut block = gather(image,block_row,block_col,channel);
                for row in block.iter_mut() {
                    for val in row.iter_mut() {
                        *val -= 128.0;
                    }
                }
                block = multiply(&trans_t,&multiply(&block,&trans));
                for i in 0..BLOCK {
                    for j in 0..BLOCK {
                        let divisor = *table.get(i,j).unwrap() as f64;
                        block[i][j] = round_half_away(block[i][j] * quality / divisor);
                    }
                }
                scatter(image,block_row,block_col,channel,&block);
            }
        }
    }
    Ok(())
}

/// Reconstruct pixel values in place from quantized coefficients.
pub fn inverse(image: &mut Matrix<Pixel>, table: &Matrix<u8>, quality: u8) -> Result<(),Error> {
    check_args(table,quality)?;
    let trans = basis();
    let trans_t = transpose(&trans);
    let quality = quality as f64;
    let subpixels = match image.get(0,0) {
        Some(pixel) => pixel.len(),
        None => return Ok(())
    };
    for block_row in (0..image.rows()).step_by(BLOCK) {
        for block_col in (0..image.cols()).step_by(BLOCK) {
            for channel in 0..subpixels {
                let mut block = gather(image,block_row,block_col,channel);
                for i in 0..BLOCK {
                    for j in 0..BLOCK {
                        let factor = *table.get(i,j).unwrap() as f64;
                        block[i][j] = block[i][j] / quality * factor;
                    }
                }
                block = multiply(&trans,&multiply(&block,&trans_t));
                for row in block.iter_mut() {
                    for val in row.iter_mut() {
                        *val = round_half_away(*val + 128.0);
                    }
                }
                scatter(image,block_row,block_col,channel,&block);
            }
        }
    }
    Ok(())
}

/// One channel of one block; cells beyond the image read as zero.
fn gather(image: &Matrix<Pixel>, block_row: usize, block_col: usize, channel: usize) -> Block {
    let mut ans = [[0.0;BLOCK];BLOCK];
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            ans[i][j] = match image.get(block_row + i,block_col + j) {
                Some(pixel) => pixel.get(channel),
                None => 0.0
            };
        }
    }
    ans
}

/// Write one channel of one block back, skipping cells beyond the image.
fn scatter(image: &mut Matrix<Pixel>, block_row: usize, block_col: usize, channel: usize, block: &Block) {
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            if let Some(pixel) = image.get_mut(block_row + i,block_col + j) {
                pixel.set(channel,block[i][j]);
            }
        }
    }
}

#[cfg(test)]
fn test_image(rows: usize, cols: usize, value: impl Fn(usize,usize) -> f64) -> Matrix<Pixel> {
    let mut ans = Matrix::new(rows,cols);
    for r in 0..rows {
        for c in 0..cols {
            ans.set(r,c,Pixel::filled(1,value(r,c)));
        }
    }
    ans
}

#[cfg(test)]
fn ones_table() -> Matrix<u8> {
    let mut ans = Matrix::new(8,8);
    for i in 0..8 {
        for j in 0..8 {
            ans.set(i,j,1);
        }
    }
    ans
}

#[test]
fn basis_is_orthonormal() {
    let trans = basis();
    let product = multiply(&transpose(&trans),&trans);
    for i in 0..BLOCK {
        for j in 0..BLOCK {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((product[i][j] - expected).abs() < 1e-12,
                "basis product off at {},{}",i,j);
        }
    }
}

#[test]
fn rounding_goes_away_from_zero() {
    assert_eq!(round_half_away(2.5),3.0);
    assert_eq!(round_half_away(2.49),2.0);
    assert_eq!(round_half_away(-2.5),-3.0);
    assert_eq!(round_half_away(-2.3),-2.0);
    assert_eq!(round_half_away(0.0),0.0);
}

#[test]
fn constant_image_has_no_ac_energy() {
    let mut image = test_image(8,8,|_,_| 128.0);
    forward(&mut image,&default_table(),1).expect("transform failed");
    for pixel in image.iter() {
        assert_eq!(pixel.get(0),0.0);
    }
}

#[test]
fn round_trip_with_unit_table() {
    // quantization disabled: reconstruction within the rounding bound
    let mut image = test_image(16,16,|r,c| (r * 9 + c * 5 + 10) as f64);
    let original = image.clone();
    forward(&mut image,&ones_table(),1).expect("transform failed");
    inverse(&mut image,&ones_table(),1).expect("transform failed");
    for r in 0..16 {
        for c in 0..16 {
            let a = original.get(r,c).unwrap().get(0);
            let b = image.get(r,c).unwrap().get(0);
            assert!((a - b).abs() <= 1.0,"drift at {},{}: {} vs {}",r,c,a,b);
        }
    }
}

#[test]
fn uniform_image_survives_quantization() {
    let mut image = test_image(16,16,|_,_| 128.0);
    forward(&mut image,&default_table(),1).expect("transform failed");
    inverse(&mut image,&default_table(),1).expect("transform failed");
    for pixel in image.iter() {
        assert_eq!(pixel.get(0),128.0);
    }
}

#[test]
fn zero_quality_is_rejected() {
    let mut image = test_image(8,8,|_,_| 0.0);
    assert!(matches!(forward(&mut image,&default_table(),0),Err(Error::OutOfRange(_))));
    assert!(matches!(inverse(&mut image,&default_table(),0),Err(Error::OutOfRange(_))));
}
