use clap::{arg,crate_version,Command};
use humdi::{huffman,container,diff,matrix,ppm};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        std::io::stdin().read_line(&mut ans).expect("could not read stdin");
        if ans.trim_end()=="y" || ans.trim_end()=="Y" {
            return true;
        }
        return false;
    }
    true
}

/// Build the Humdi container for a picture file, ready to compress.
fn load_picture(path_in: &str, quality: u8, table_path: Option<&String>) -> Result<container::HumdiFile,Box<dyn std::error::Error>> {
    let picture = ppm::PpmFile::parse(&std::fs::read(path_in)?)?;
    let color_depth = picture.color_depth();
    let mut file = container::HumdiFile::from_image(picture.into_pixels(),color_depth);
    file.set_quality(quality);
    if let Some(path) = table_path {
        file.set_quantization(matrix::read_table(&std::fs::read(path)?)?)?;
    }
    Ok(file)
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress a picture:   `humdi compress -m image -i photo.ppm -o photo.humdi --quality 50`
Expand a picture:     `humdi expand -m image -i photo.humdi -o photo.ppm`
Compress any file:    `humdi compress -m huffman -i notes.txt -o notes.huf`
Compare two pictures: `humdi diff -a photo.ppm -b restored.ppm -o delta.ppm --rmse`";

    let methods = ["huffman","image"];

    let mut main_cmd = Command::new("humdi")
        .about("Compress files with Huffman coding, pictures with a block DCT")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(methods)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(--quality <QUALITY> "image quality 0-100, image method only")
            .value_parser(clap::value_parser!(u8).range(0..=100))
            .required(false).default_value("100"))
        .arg(arg!(--table <PATH> "8x8 quantization table file, image method only")
            .required(false))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(methods)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a file"));

    main_cmd = main_cmd.subcommand(Command::new("diff")
        .arg(arg!(-a --first <PATH> "first picture").required(true))
        .arg(arg!(-b --second <PATH> "second picture").required(true))
        .arg(arg!(-o --output <PATH> "difference picture path").required(true))
        .arg(arg!(--rmse "print the root mean square error"))
        .about("compare two pictures"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let (in_size,out_size) = match method.as_str() {
            "huffman" => {
                let buf = std::fs::read(path_in)?;
                let encoded = huffman::compress(&buf)?;
                log::info!("entropy {:.4} bits per symbol, redundancy {:.4}",
                    encoded.entropy_rate,encoded.redundancy);
                std::fs::write(path_out,&encoded.bytes)?;
                (buf.len(),encoded.bytes.len())
            },
            "image" => {
                let quality = *cmd.get_one::<u8>("quality").expect(RCH);
                let in_size = std::fs::metadata(path_in)?.len() as usize;
                let mut file = load_picture(path_in,quality,cmd.get_one::<String>("table"))?;
                file.forward()?;
                let encoded = file.compress()?;
                log::info!("entropy {:.4} bits per symbol, redundancy {:.4}",
                    encoded.entropy_rate,encoded.redundancy);
                std::fs::write(path_out,&encoded.bytes)?;
                (in_size,encoded.bytes.len())
            },
            _ => {
                eprintln!("{} not supported",method);
                return Err(Box::new(std::fmt::Error));
            }
        };
        eprintln!("compressed {} into {}",in_size,out_size);
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let (in_size,out_size) = match method.as_str() {
            "huffman" => {
                let buf = std::fs::read(path_in)?;
                let expanded = huffman::expand(&buf)?;
                std::fs::write(path_out,&expanded)?;
                (buf.len(),expanded.len())
            },
            "image" => {
                let buf = std::fs::read(path_in)?;
                let mut file = container::HumdiFile::read(&buf)?;
                file.inverse()?;
                let color_depth = file.color_depth();
                let picture = ppm::PpmFile::from_matrix(file.into_pixels(),color_depth);
                let out = picture.to_bytes();
                std::fs::write(path_out,&out)?;
                (buf.len(),out.len())
            },
            _ => {
                eprintln!("{} not supported",method);
                return Err(Box::new(std::fmt::Error));
            }
        };
        eprintln!("expanded {} into {}",in_size,out_size);
    }

    if let Some(cmd) = matches.subcommand_matches("diff") {
        let path_first = cmd.get_one::<String>("first").expect(RCH);
        let path_second = cmd.get_one::<String>("second").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let first = ppm::PpmFile::parse(&std::fs::read(path_first)?)?;
        let second = ppm::PpmFile::parse(&std::fs::read(path_second)?)?;
        let (delta,rmse) = diff::difference(first.pixels(),second.pixels())?;
        let picture = ppm::PpmFile::from_matrix(delta,255);
        std::fs::write(path_out,picture.to_bytes())?;
        if cmd.get_flag("rmse") {
            println!("RMSE: {}",rmse);
        }
    }

    Ok(())
}
