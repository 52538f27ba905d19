//! Row-major 2-D container used for pixel matrices and quantization
//! tables, plus a reader for plain-text 8x8 tables.

use num_traits::Zero;
use crate::Error;

#[derive(Clone,Debug,PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>
}

impl <T: Clone + Zero> Matrix<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![T::zero();rows*cols] }
    }
}

impl <T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.rows && col < self.cols {
            self.data.get_mut(row * self.cols + col)
        } else {
            None
        }
    }
    /// Panics when the position is outside the matrix; parsing code that
    /// cannot rule this out uses `set_at` instead.
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        assert!(row < self.rows && col < self.cols,
            "position {},{} outside a {}x{} matrix",row,col,self.rows,self.cols);
        self.data[row * self.cols + col] = val;
    }
    /// Set by linear (row-major) position, with a typed error for data
    /// streams that run past the declared dimensions.
    pub fn set_at(&mut self, pos: usize, val: T) -> Result<(),Error> {
        if pos >= self.data.len() {
            return Err(Error::OutOfRange(format!(
                "position {} outside a {}x{} matrix",pos,self.rows,self.cols)));
        }
        self.data[pos] = val;
        Ok(())
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

/// Read a plain-text 8x8 quantization table: 64 whitespace-separated
/// integers in 0-255, row-major.
pub fn read_table(buf: &[u8]) -> Result<Matrix<u8>,Error> {
    let text = std::str::from_utf8(buf)
        .map_err(|_| Error::BadHeader("table file is not text".to_string()))?;
    let mut ans = Matrix::new(8,8);
    let mut count = 0;
    for token in text.split_whitespace() {
        if count == 64 {
            return Err(Error::BadHeader(format!("table entry {} past the 64th",token)));
        }
        let value: u8 = token.parse()
            .map_err(|_| Error::BadHeader(format!("table entry `{}` is not an integer in 0-255",token)))?;
        ans.set(count / 8,count % 8,value);
        count += 1;
    }
    if count < 64 {
        return Err(Error::UnexpectedEnd(format!("table file ended after {} of 64 entries",count)));
    }
    Ok(ans)
}

#[test]
fn get_and_set() {
    let mut mat: Matrix<u8> = Matrix::new(2,3);
    mat.set(1,2,9);
    assert_eq!(mat.get(1,2),Some(&9));
    assert_eq!(mat.get(2,0),None);
    assert_eq!(mat.get(0,3),None);
}

#[test]
fn set_at_reports_overrun() {
    let mut mat: Matrix<u8> = Matrix::new(2,2);
    assert!(mat.set_at(3,1).is_ok());
    assert!(matches!(mat.set_at(4,1),Err(Error::OutOfRange(_))));
}

#[test]
fn read_table_round_trip() {
    let text = b"16 11 10 16 24 40 51 61\n12 12 14 19 26 58 60 55\n\
        14 13 16 24 40 57 69 56\n14 17 22 29 51 87 80 62\n\
        18 22 37 56 68 109 103 77\n24 35 55 64 81 104 113 92\n\
        49 64 78 87 103 121 120 101\n72 92 95 98 112 100 103 99\n";
    let table = read_table(text).expect("parse failed");
    assert_eq!(table.get(0,0),Some(&16));
    assert_eq!(table.get(4,5),Some(&109));
    assert_eq!(table.get(7,7),Some(&99));
}

#[test]
fn read_table_rejects_bad_input() {
    assert!(matches!(read_table(b"1 2 3"),Err(Error::UnexpectedEnd(_))));
    assert!(matches!(read_table(b"300 ".repeat(64).as_slice()),Err(Error::BadHeader(_))));
    assert!(matches!(read_table(b"7 ".repeat(65).as_slice()),Err(Error::BadHeader(_))));
}
