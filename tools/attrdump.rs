// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use std::process::ExitCode;

use clap::Parser;

use p11attr::codec;
use p11attr::json::{JsonObjects, JsonTemplate};
use p11attr::pkcs11::*;
use p11attr::registry;
use p11attr::{BuildMode, CodecLimits, Config, Template};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Arguments {
    /// JSON file with a template, or a list of objects with --objects
    #[arg(short = 'f', long)]
    file: String,

    /// Build mode, "create" or "search"
    #[arg(short = 'm', long, default_value = "create")]
    mode: String,

    /// The file holds a list of objects instead of a single template
    #[arg(short = 'o', long)]
    objects: bool,

    /// Decode every triple back and print the resulting attribute
    #[arg(short = 'd', long)]
    decode: bool,

    /// Configuration file, the default locations are searched otherwise
    #[arg(short = 'c', long)]
    config: Option<String>,
}

fn triple_len(len: CK_ULONG) -> String {
    if len == CK_UNAVAILABLE_INFORMATION {
        "unset".to_string()
    } else {
        len.to_string()
    }
}

fn dump(
    template: &Template,
    mode: BuildMode,
    limits: &CodecLimits,
    decode: bool,
) -> p11attr::Result<()> {
    for raw in template.build(mode, limits)? {
        println!(
            "{} ({}): {}",
            registry::name_of(raw.type_),
            triple_len(raw.len()),
            hex::encode(raw.as_slice())
        );
        if decode {
            let attr = codec::decode(&raw, limits)?;
            println!("  -> {}", attr);
        }
    }
    Ok(())
}

fn run(args: &Arguments) -> p11attr::Result<()> {
    let conf = match &args.config {
        Some(filename) => Config::from_file(filename)?,
        None => Config::load()?,
    };
    let limits = conf.codec_limits();
    let mode = match args.mode.as_str() {
        "create" => BuildMode::Create,
        "search" => BuildMode::Search,
        m => {
            return Err(p11attr::Error::config_error(format!(
                "unknown mode {}",
                m
            )))
        }
    };

    if args.objects {
        let objs = JsonObjects::load(&args.file)?.to_objects()?;
        for (idx, obj) in objs.iter().enumerate() {
            println!("Object {}:", idx);
            dump(&obj.template(mode), mode, &limits, args.decode)?;
        }
    } else {
        let template = JsonTemplate::load(&args.file)?.to_template()?;
        dump(&template, mode, &limits, args.decode)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Arguments::parse();

    #[cfg(feature = "logger")]
    p11attr::log::log_init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(0xFF)
        }
    }
}
