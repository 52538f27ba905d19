//! Per-symbol occurrence statistics.
//! This is used by the `huffman` module to weigh the code tree
//! and to report entropy and redundancy figures.

/// Statistics for one distinct symbol within a data buffer.
/// The derived figures are recomputed whenever the quantity or
/// the total count changes.
#[derive(Clone,Debug)]
pub struct SymbolStats {
    symbol: u8,
    quantity: u32,
    total: u32,
    possibility: f64,
    information_content: f64
}

impl SymbolStats {
    pub fn new(symbol: u8, quantity: u32, total: u32) -> Self {
        let mut ans = Self {
            symbol,
            quantity,
            total,
            possibility: 0.0,
            information_content: 0.0
        };
        ans.refresh();
        ans
    }
    pub fn symbol(&self) -> u8 {
        self.symbol
    }
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
    pub fn possibility(&self) -> f64 {
        self.possibility
    }
    pub fn information_content(&self) -> f64 {
        self.information_content
    }
    pub fn add_quantity(&mut self, value: u32) {
        self.quantity += value;
        self.refresh();
    }
    fn refresh(&mut self) {
        if self.total != 0 {
            self.possibility = self.quantity as f64 / self.total as f64;
            self.information_content = (1.0 / self.possibility).log2();
        }
    }
}

/// Count every distinct byte in `data`.  The returned entries are in
/// ascending symbol order; the code tree builder relies on this order
/// to assign reproducible codes.  Empty input yields an empty table.
pub fn tally(data: &[u8]) -> Vec<SymbolStats> {
    let total = data.len() as u32;
    let mut slots: Vec<Option<SymbolStats>> = vec![None;256];
    for &byte in data {
        match &mut slots[byte as usize] {
            Some(entry) => entry.add_quantity(1),
            slot => *slot = Some(SymbolStats::new(byte,1,total))
        }
    }
    slots.into_iter().flatten().collect()
}

/// Entropy rate of the tallied data in bits per symbol.
pub fn entropy_rate(stats: &[SymbolStats]) -> f64 {
    stats.iter().map(|s| s.possibility() * s.information_content()).sum()
}

#[test]
fn tally_counts_and_orders() {
    let stats = tally(b"DACABABCAAB");
    let symbols: Vec<u8> = stats.iter().map(|s| s.symbol()).collect();
    assert_eq!(symbols,vec![b'A',b'B',b'C',b'D']);
    let quantities: Vec<u32> = stats.iter().map(|s| s.quantity()).collect();
    assert_eq!(quantities,vec![5,3,2,1]);
}

#[test]
fn entropy_of_uniform_pair() {
    let stats = tally(b"ABAB");
    let h = entropy_rate(&stats);
    assert!((h - 1.0).abs() < 1e-12);
}

#[test]
fn entropy_of_single_symbol_is_zero() {
    let stats = tally(b"AAAA");
    assert_eq!(stats.len(),1);
    assert_eq!(entropy_rate(&stats),0.0);
}

#[test]
fn empty_input_yields_empty_table() {
    let stats = tally(b"");
    assert!(stats.is_empty());
    assert_eq!(entropy_rate(&stats),0.0);
}
