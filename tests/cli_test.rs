use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// 16x16 ASCII graymap with every pixel set to `value`
fn write_constant_pgm(temp_dir: &tempfile::TempDir, value: u32) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let mut txt = String::from("P2\n16 16\n255\n");
    for _row in 0..16 {
        for _col in 0..16 {
            txt.push_str(&format!("{} ",value));
        }
        txt.push('\n');
    }
    let path = temp_dir.path().join("constant.pgm");
    std::fs::write(&path,txt)?;
    Ok(path)
}

fn huffman_round_trip_test(payload: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("original.txt");
    let packed_path = temp_dir.path().join("packed.huf");
    let out_path = temp_dir.path().join("restored.txt");
    std::fs::write(&in_path,payload)?;
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("compress")
        .arg("-m").arg("huffman")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("expand")
        .arg("-m").arg("huffman")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(&out_path)?,payload.to_vec());
    Ok(())
}

#[test]
fn huffman_compression_round_trip() -> STDRESULT {
    huffman_round_trip_test(b"AAAAABBBCCD")?;
    huffman_round_trip_test(b"the rain in spain stays mainly in the plain\n")
}

#[test]
fn image_compression_reconstructs_constant_picture() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_constant_pgm(&temp_dir,128)?;
    let packed_path = temp_dir.path().join("constant.humdi");
    let out_path = temp_dir.path().join("restored.pgm");
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("compress")
        .arg("-m").arg("image")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .arg("--quality").arg("50")
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("expand")
        .arg("-m").arg("image")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    let restored = humdi::ppm::PpmFile::parse(&std::fs::read(&out_path)?)?;
    assert_eq!(restored.pixels().rows(),16);
    assert_eq!(restored.pixels().cols(),16);
    for pixel in restored.pixels().iter() {
        assert_eq!(pixel.get(0),128.0);
    }
    Ok(())
}

#[test]
fn custom_quantization_table_is_accepted() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_constant_pgm(&temp_dir,128)?;
    let table_path = temp_dir.path().join("table.txt");
    let packed_path = temp_dir.path().join("constant.humdi");
    std::fs::write(&table_path,"1 ".repeat(64))?;
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("compress")
        .arg("-m").arg("image")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .arg("--quality").arg("50")
        .arg("--table").arg(&table_path)
        .assert()
        .success();
    Ok(())
}

#[test]
fn zero_quality_fails_with_message() -> STDRESULT {
    // 25 collapses to the effective factor 0, which cannot be inverted
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_constant_pgm(&temp_dir,128)?;
    let packed_path = temp_dir.path().join("constant.humdi");
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("compress")
        .arg("-m").arg("image")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .arg("--quality").arg("25")
        .assert()
        .failure()
        .stderr(predicate::str::contains("quality"));
    Ok(())
}

#[test]
fn diff_of_identical_pictures_reports_zero_rmse() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_constant_pgm(&temp_dir,77)?;
    let out_path = temp_dir.path().join("delta.pgm");
    let mut cmd = Command::cargo_bin("humdi")?;
    cmd.arg("diff")
        .arg("-a").arg(&in_path)
        .arg("-b").arg(&in_path)
        .arg("-o").arg(&out_path)
        .arg("--rmse")
        .assert()
        .success()
        .stdout(predicate::str::contains("RMSE: 0"));
    let delta = humdi::ppm::PpmFile::parse(&std::fs::read(&out_path)?)?;
    for pixel in delta.pixels().iter() {
        assert_eq!(pixel.get(0),128.0);
    }
    Ok(())
}
