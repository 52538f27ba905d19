//! Huffman entropy coding with a self-describing bitstream.
//!
//! The encoded buffer carries its own code table, so decoding needs no
//! external dictionary.  The layout is:
//!
//! * one ASCII digit `0`-`7`: how many low bits of the final body byte
//!   are padding (`0` means the final byte is fully used)
//! * one entry per distinct symbol: the code length in ASCII decimal,
//!   a `#`, the code bits packed MSB-first into `ceil(len/8)` bytes,
//!   then the raw symbol byte
//! * a newline terminating the header
//! * the body: every input symbol's code concatenated MSB-first
//!
//! This transforms buffers, not files; the caller does the io.

use std::collections::HashMap;
use bit_vec::BitVec;
use crate::tools::stats;
use crate::tools::code_tree::CodeTree;
use crate::Error;

/// Result of a compression run, with the statistics of the original
/// data alongside the encoded bytes.
pub struct Encoded {
    pub bytes: Vec<u8>,
    /// entropy rate of the input in bits per symbol
    pub entropy_rate: f64,
    /// average code length minus the entropy rate, never negative
    pub redundancy: f64
}

/// Main compression function
pub fn compress(ibuf: &[u8]) -> Result<Encoded,Error> {
    let table = stats::tally(ibuf);
    let entropy_rate = stats::entropy_rate(&table);
    if table.is_empty() {
        return Ok(Encoded { bytes: vec![b'0',b'\n'], entropy_rate, redundancy: 0.0 });
    }
    let tree = CodeTree::build(&table);
    let codes = tree.codes();
    let mut redundancy = -entropy_rate;
    for (entry,(_,code)) in table.iter().zip(codes.iter()) {
        redundancy += code.len() as f64 * entry.possibility();
    }
    let mut code_map: Vec<Option<BitVec>> = vec![None;256];
    for (symbol,code) in &codes {
        code_map[*symbol as usize] = Some(code.clone());
    }
    let mut body = BitVec::new();
    for &byte in ibuf {
        // every byte of the input was tallied, so the map entry exists
        body.extend(code_map[byte as usize].as_ref().unwrap().iter());
    }
    let pad_bits = (8 - body.len() % 8) % 8;

    let mut ans: Vec<u8> = Vec::new();
    ans.push(b'0' + pad_bits as u8);
    for (symbol,code) in &codes {
        ans.extend_from_slice(code.len().to_string().as_bytes());
        ans.push(b'#');
        ans.extend_from_slice(&code.to_bytes());
        ans.push(*symbol);
    }
    ans.push(b'\n');
    ans.extend_from_slice(&body.to_bytes());
    log::debug!("code tree: {} leaves, {} internal nodes, height {}",
        tree.leaf_count(),tree.internal_count(),tree.height());
    log::debug!("entropy {:.4} bits per symbol, redundancy {:.4}",
        entropy_rate,redundancy);
    Ok(Encoded { bytes: ans, entropy_rate, redundancy })
}

/// Main decompression function
pub fn expand(ibuf: &[u8]) -> Result<Vec<u8>,Error> {
    let mut pos: usize = 0;
    let (decode_map,pad_bits) = read_header(ibuf,&mut pos)?;
    decode_body(&ibuf[pos..],&decode_map,pad_bits)
}

/// Parse the header into a code → symbol map and the pad digit.
/// `pos` is left at the first body byte.
fn read_header(ibuf: &[u8], pos: &mut usize) -> Result<(HashMap<BitVec,u8>,usize),Error> {
    let mut decode_map: HashMap<BitVec,u8> = HashMap::new();
    let first = *ibuf.get(*pos)
        .ok_or_else(|| Error::UnexpectedEnd("empty buffer".to_string()))?;
    if !(b'0'..=b'7').contains(&first) {
        return Err(Error::BadHeader(format!("pad digit `{}` at position 0",first as char)));
    }
    let pad_bits = (first - b'0') as usize;
    *pos += 1;
    while let Some(code_len) = next_number(ibuf,pos)? {
        if code_len == 0 || code_len > 255 {
            // a byte alphabet admits at most 255 bits per code
            return Err(Error::BadHeader(format!("code length {} before position {}",code_len,pos)));
        }
        let code_bytes = (code_len + 7) / 8;
        if *pos + code_bytes >= ibuf.len() {
            return Err(Error::UnexpectedEnd(format!("header entry truncated at position {}",pos)));
        }
        let mut code = BitVec::from_bytes(&ibuf[*pos..*pos+code_bytes]);
        code.truncate(code_len);
        *pos += code_bytes;
        decode_map.insert(code,ibuf[*pos]);
        *pos += 1;
    }
    Ok((decode_map,pad_bits))
}

/// Scan the body bit by bit, emitting a symbol whenever the accumulated
/// bits match a declared code.  The codes are prefix-free so the greedy
/// match is unambiguous.  The final byte's low pad bits are skipped.
fn decode_body(body: &[u8], decode_map: &HashMap<BitVec,u8>, pad_bits: usize) -> Result<Vec<u8>,Error> {
    let bits = BitVec::from_bytes(body);
    let valid = bits.len().saturating_sub(pad_bits);
    let mut ans: Vec<u8> = Vec::new();
    let mut candidate = BitVec::new();
    for bit in bits.iter().take(valid) {
        candidate.push(bit);
        if let Some(&symbol) = decode_map.get(&candidate) {
            ans.push(symbol);
            candidate.truncate(0);
        }
    }
    Ok(ans)
}

/// Read the ASCII decimal number ending with `#` at `pos`.  Returns
/// None when the byte at `pos` is neither digit nor `#`, which is the
/// end-of-header sentinel (the byte is consumed, as the writer puts
/// the terminating newline there).
fn next_number(ibuf: &[u8], pos: &mut usize) -> Result<Option<usize>,Error> {
    let mut ans: usize = 0;
    let mut seen_digit = false;
    loop {
        let byte = *ibuf.get(*pos)
            .ok_or_else(|| Error::UnexpectedEnd(format!("header ended inside a number at position {}",pos)))?;
        *pos += 1;
        match byte {
            b'0'..=b'9' => {
                ans = ans * 10 + (byte - b'0') as usize;
                seen_digit = true;
                if ans > 65535 {
                    return Err(Error::BadHeader(format!("number too large at position {}",*pos - 1)));
                }
            },
            b'#' => {
                return Ok(Some(ans));
            },
            _ if !seen_digit => {
                return Ok(None);
            },
            _ => {
                return Err(Error::BadHeader(format!("unterminated code length at position {}",*pos - 1)));
            }
        }
    }
}

#[test]
fn golden_stream() {
    // A gets the one-bit code, D and C share depth three with B above them
    let encoded = compress(b"AAAAABBBCCD").expect("compression failed");
    let expected = "34 31 23 00 41 32 23 80 42 33 23 E0 43 33 23 C0 44 0A 05 5F E0";
    assert_eq!(encoded.bytes,hex::decode(expected.replace(' ',"")).unwrap());
    assert!(encoded.redundancy >= 0.0);
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let encoded = compress(test_data).expect("compression failed");
    let expanded = expand(&encoded.bytes).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn invertibility_all_byte_values() {
    let mut test_data: Vec<u8> = Vec::new();
    for i in 0..=255u8 {
        for _rep in 0..(i as usize % 5 + 1) {
            test_data.push(i);
        }
    }
    let encoded = compress(&test_data).expect("compression failed");
    let expanded = expand(&encoded.bytes).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn single_symbol_round_trip() {
    let encoded = compress(b"AAAA").expect("compression failed");
    assert_eq!(expand(&encoded.bytes).expect("expansion failed"),b"AAAA".to_vec());
}

#[test]
fn empty_round_trip() {
    let encoded = compress(b"").expect("compression failed");
    assert_eq!(encoded.bytes,b"0\n".to_vec());
    assert!(expand(&encoded.bytes).expect("expansion failed").is_empty());
}

#[test]
fn entropy_bound() {
    for sample in [&b"AAAAABBBCCD"[..],&b"abcdefgh"[..],&b"mississippi"[..]] {
        let encoded = compress(sample).expect("compression failed");
        assert!(encoded.redundancy >= 0.0,"redundancy below entropy bound");
    }
}

#[test]
fn header_is_self_describing() {
    // nothing but the encoded bytes crosses this boundary
    let encoded = compress(b"see the sea").expect("compression failed").bytes;
    assert_eq!(expand(&encoded).expect("expansion failed"),b"see the sea".to_vec());
}

#[test]
fn bad_pad_digit_rejected() {
    assert!(matches!(expand(b"9\n"),Err(Error::BadHeader(_))));
}

#[test]
fn truncated_header_rejected() {
    let mut encoded = compress(b"AAAAABBBCCD").expect("compression failed").bytes;
    encoded.truncate(3);
    assert!(matches!(expand(&encoded),Err(Error::UnexpectedEnd(_))));
}
