//! Difference picture between two images of identical shape, with the
//! root mean square error over all samples.

use crate::matrix::Matrix;
use crate::pixel::Pixel;
use crate::Error;

/// Compare two pictures.  Returns a grey picture centered on 128 (so
/// identical inputs come out mid-grey) and the RMSE of the samples.
pub fn difference(one: &Matrix<Pixel>, two: &Matrix<Pixel>) -> Result<(Matrix<Pixel>,f64),Error> {
    if one.rows() != two.rows() || one.cols() != two.cols() {
        return Err(Error::DimensionMismatch(format!(
            "pictures are {}x{} and {}x{}",one.rows(),one.cols(),two.rows(),two.cols())));
    }
    let mut ans = Matrix::new(one.rows(),one.cols());
    let mut square_sum = 0.0;
    let mut samples: usize = 0;
    for (mat_pos,(a,b)) in one.iter().zip(two.iter()).enumerate() {
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch(format!(
                "pixel {} has {} samples in one picture and {} in the other",mat_pos,a.len(),b.len())));
        }
        for channel in 0..a.len() {
            let d = a.get(channel) - b.get(channel);
            square_sum += d * d;
        }
        samples += a.len();
        let shifted = (a.clone() - b.clone()) + 128.0;
        ans.set_at(mat_pos,shifted.grey())?;
    }
    let rmse = match samples {
        0 => 0.0,
        n => (square_sum / n as f64).sqrt()
    };
    Ok((ans,rmse))
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
fn identical_pictures_are_mid_grey() {
    let mat = grey_matrix(4,4,|r,c| (r * 16 + c) as f64);
    let (diff,rmse) = difference(&mat,&mat).expect("difference failed");
    assert_eq!(rmse,0.0);
    for pixel in diff.iter() {
        assert_eq!(pixel.get(0),128.0);
    }
}

#[test]
fn known_error() {
    let one = grey_matrix(2,2,|_,_| 10.0);
    let two = grey_matrix(2,2,|_,_| 4.0);
    let (diff,rmse) = difference(&one,&two).expect("difference failed");
    assert_eq!(rmse,6.0);
    for pixel in diff.iter() {
        assert_eq!(pixel.get(0),134.0);
    }
}

#[test]
fn shape_mismatch_is_rejected() {
    let one = grey_matrix(2,2,|_,_| 0.0);
    let two = grey_matrix(2,3,|_,_| 0.0);
    assert!(matches!(difference(&one,&two),Err(Error::DimensionMismatch(_))));
}
