//! Pixel value type with a run-time number of samples.
//! One sample for grayscale data, three for RGB.  The arithmetic
//! follows the rule that an empty pixel adopts the width of the other
//! operand, which also gives `Pixel` a lawful additive zero.

use std::ops::{Add,Sub};
use num_traits::Zero;

#[derive(Clone,Debug,PartialEq)]
pub struct Pixel {
    samples: Vec<f64>
}

impl Pixel {
    /// Pixel with `subpixels` samples, all zero.
    pub fn new(subpixels: usize) -> Self {
        Self { samples: vec![0.0;subpixels] }
    }
    /// Pixel with `subpixels` samples, all set to `val`.
    pub fn filled(subpixels: usize, val: f64) -> Self {
        Self { samples: vec![valid_value(val);subpixels] }
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn get(&self, subpixel: usize) -> f64 {
        self.samples[subpixel]
    }
    pub fn set(&mut self, subpixel: usize, val: f64) {
        self.samples[subpixel] = valid_value(val);
    }
    /// Collapse to a single-sample pixel holding the average value.
    pub fn grey(&self) -> Pixel {
        let mut avg = 0.0;
        for &sample in &self.samples {
            avg += sample / self.samples.len() as f64;
        }
        Pixel::filled(1,avg)
    }
}

/// Keep stored samples finite: infinities saturate, NaN pins low.
fn valid_value(val: f64) -> f64 {
    if val.is_infinite() {
        f64::MAX
    } else if val.is_nan() {
        f64::MIN
    } else {
        val
    }
}

impl Add for Pixel {
    type Output = Pixel;
    fn add(mut self, rhs: Pixel) -> Pixel {
        if self.is_empty() {
            return rhs;
        }
        if rhs.is_empty() {
            return self;
        }
        assert_eq!(self.len(),rhs.len(),"pixel widths differ");
        for (sample,other) in self.samples.iter_mut().zip(rhs.samples.iter()) {
            *sample = valid_value(*sample + other);
        }
        self
    }
}

impl Sub for Pixel {
    type Output = Pixel;
    fn sub(mut self, rhs: Pixel) -> Pixel {
        if self.is_empty() {
            return rhs;
        }
        if rhs.is_empty() {
            return self;
        }
        assert_eq!(self.len(),rhs.len(),"pixel widths differ");
        for (sample,other) in self.samples.iter_mut().zip(rhs.samples.iter()) {
            *sample = valid_value(*sample - other);
        }
        self
    }
}

impl Add<f64> for Pixel {
    type Output = Pixel;
    fn add(mut self, rhs: f64) -> Pixel {
        for sample in self.samples.iter_mut() {
            *sample = valid_value(*sample + rhs);
        }
        self
    }
}

impl Zero for Pixel {
    fn zero() -> Self {
        Self { samples: Vec::new() }
    }
    fn is_zero(&self) -> bool {
        self.samples.iter().all(|sample| *sample == 0.0)
    }
}

#[test]
fn grey_averages_samples() {
    let mut p = Pixel::new(3);
    p.set(0,10.0);
    p.set(1,20.0);
    p.set(2,60.0);
    let g = p.grey();
    assert_eq!(g.len(),1);
    assert!((g.get(0) - 30.0).abs() < 1e-12);
}

#[test]
fn empty_adopts_other_operand() {
    let p = Pixel::zero() + Pixel::filled(3,5.0);
    assert_eq!(p,Pixel::filled(3,5.0));
}

#[test]
fn scalar_shift() {
    let p = Pixel::filled(2,-3.0) + 128.0;
    assert_eq!(p,Pixel::filled(2,125.0));
}

#[test]
fn non_finite_values_are_tamed() {
    let mut p = Pixel::new(1);
    p.set(0,f64::INFINITY);
    assert_eq!(p.get(0),f64::MAX);
    p.set(0,f64::NAN);
    assert_eq!(p.get(0),f64::MIN);
}
