use tiff_strips::{Decoder, FieldEntry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(image) = std::env::args_os().nth(1) else {
        eprintln!("Usage: tiff-ls FILE");
        return Ok(());
    };

    let data = std::fs::read(image)?;
    let decoder = Decoder::new(data.as_slice())?;

    for (index, fields) in decoder.directories().iter().enumerate() {
        println!("Directory {index} at {:x}", fields.offset().0);
        println!("Name\tHex\tType\tCount\tValues");

        for (tag, entry) in fields.iter() {
            println!(
                "{}\t{:04x}\t{}\t{}\t{}",
                tag.name(),
                tag.to_u16(),
                entry.field_type().name(),
                entry.count(),
                preview(entry),
            );
        }

        match decoder.decode(index) {
            Ok(image) => {
                let (width, height) = image.dimensions();
                println!("Decoded {width}x{height} pixels");
            }
            Err(err) => println!("Not decodable: {err}"),
        }
        println!();
    }

    if let Some(err) = decoder.chain_error() {
        println!("Directory chain stopped: {err}");
    }

    Ok(())
}

fn preview(entry: &FieldEntry) -> String {
    if let Some(text) = entry.as_string() {
        return format!("{text:?}");
    }

    let mut shown: Vec<String> = entry.values().iter().take(4).map(|v| v.to_string()).collect();
    if entry.count() > 4 {
        shown.push("...".into());
    }
    shown.join(" ")
}
