#![deny(
    rust_2018_idioms,
    unreachable_pub,
    unsafe_code,
    unused_imports,
    unused_mut,
    missing_debug_implementations
)]

use anyhow::Context;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use malie_arc::{
    byteview::ByteView,
    dispatcher::{self, DispatchOptions},
    error::ArchiveError,
    image, keys::KeyCatalog,
    reader, sidecar::Sidecar,
    writer::{self, WriteEntry},
};
use std::{
    fs::{self, File},
    io::Write as _,
    path::PathBuf,
    process::ExitCode,
};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "malie_arc_cli")]
enum Opt {
    /// Decrypt an archive in place to a single plaintext blob.
    UnpackPlain {
        #[structopt(parse(from_os_str))]
        archive: PathBuf,
        #[structopt(parse(from_os_str))]
        out_dir: PathBuf,
    },
    /// Extract every entry to `out-dir`, emitting a metadata sidecar.
    Unpack {
        #[structopt(parse(from_os_str))]
        archive: PathBuf,
        #[structopt(parse(from_os_str))]
        out_dir: PathBuf,
    },
    /// Rebuild a plaintext archive from a previously unpacked tree.
    RepackPlain {
        #[structopt(parse(from_os_str))]
        in_dir: PathBuf,
        #[structopt(parse(from_os_str))]
        out_archive: PathBuf,
        #[structopt(parse(from_os_str))]
        sidecar: PathBuf,
    },
    /// Bidirectional mgf<->png image container conversion, in place.
    Convert {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_INPUT_NOT_FOUND: u8 = 2;
const EXIT_NO_MATCHING_KEY: u8 = 3;
const EXIT_STRUCTURAL_ERROR: u8 = 4;
const EXIT_SIDECAR_MISMATCH: u8 = 5;

fn main() -> ExitCode {
    env_logger::init();
    let opt = Opt::from_args();

    let result = match &opt {
        Opt::UnpackPlain { archive, out_dir } => unpack_plain(archive, out_dir),
        Opt::Unpack { archive, out_dir } => unpack(archive, out_dir),
        Opt::RepackPlain {
            in_dir,
            out_archive,
            sidecar,
        } => repack_plain(in_dir, out_archive, sidecar),
        Opt::Convert { file } => convert(file),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            log::error!("{}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ArchiveError>() {
        Some(ArchiveError::InputNotFound(_)) => EXIT_INPUT_NOT_FOUND,
        Some(ArchiveError::NoMatchingKey) => EXIT_NO_MATCHING_KEY,
        Some(ArchiveError::SidecarMismatch(_)) => EXIT_SIDECAR_MISMATCH,
        Some(ArchiveError::MalformedArchive(_))
        | Some(ArchiveError::TruncatedRead { .. })
        | Some(ArchiveError::CorruptBitstream)
        | Some(ArchiveError::NameEncoding(_))
        | Some(ArchiveError::UnsupportedFeature(_)) => EXIT_STRUCTURAL_ERROR,
        _ => EXIT_STRUCTURAL_ERROR,
    }
}

fn unpack_plain(archive: &PathBuf, out_dir: &PathBuf) -> anyhow::Result<()> {
    let view = ByteView::open(archive)?;
    let catalog = KeyCatalog::embedded()?;
    let (plaintext, key_label) = reader::decrypt_whole(&view, &catalog)?;
    log::debug!("unpack-plain: matched key {:?}", key_label);

    fs::create_dir_all(out_dir)?;
    let mut out_path = out_dir.clone();
    out_path.push(
        archive
            .file_name()
            .context("archive path has no file name")?,
    );
    File::create(&out_path)?.write_all(&plaintext)?;
    println!("{} {:?}", "decrypted".green(), out_path);
    Ok(())
}

fn unpack(archive: &PathBuf, out_dir: &PathBuf) -> anyhow::Result<()> {
    let view = ByteView::open(archive)?;
    let catalog = KeyCatalog::embedded()?;
    let opened = reader::open(&view, &catalog)?;
    log::debug!("unpack: matched key {:?}", opened.key_label);

    fs::create_dir_all(out_dir)?;
    let options = DispatchOptions::default();

    let progress = init_progressbar("Extracting", opened.entries.len() as u64);
    for entry in &opened.entries {
        progress.inc(1);
        if entry.is_dir() {
            let mut dir_path = out_dir.clone();
            dir_path.push(&entry.path);
            fs::create_dir_all(&dir_path)?;
            continue;
        }
        let raw_offset = entry.raw_offset.context("file entry missing raw_offset")?;
        let size = entry.size as usize;

        let bytes = if dispatcher::bypasses_decryption(&entry.path, size) {
            let raw = view.read_at(raw_offset, size)?;
            dispatcher::dispatch_tiny_entry(&raw, &options)
        } else if let Some(label) = &opened.key_label {
            let cipher = keyed_cipher(&catalog, label)?;
            malie_arc::region::read_encrypted(&view, &cipher, raw_offset, size)?
        } else {
            view.read_at(raw_offset, size)?
        };

        let output_name = dispatcher::output_name(&entry.path);
        let mut out_path = out_dir.clone();
        out_path.push(&output_name);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(&out_path)?.write_all(&bytes)?;
    }
    progress.finish_with_message("done");

    let sidecar = Sidecar::from_entries(&opened.entries, opened.key_label.as_deref().unwrap_or(""))?;
    let mut sidecar_path = out_dir.clone();
    sidecar_path.push("sidecar.json");
    File::create(&sidecar_path)?.write_all(sidecar.to_json()?.as_bytes())?;
    println!("{} {:?}", "wrote sidecar".green(), sidecar_path);
    Ok(())
}

fn keyed_cipher(
    catalog: &KeyCatalog,
    label: &str,
) -> anyhow::Result<malie_arc::cipher::Camellia256> {
    let key_entry = catalog
        .find(label)
        .context("sidecar key_name not found in catalog")?;
    Ok(malie_arc::cipher::Camellia256::new(&key_entry.key)?)
}

fn repack_plain(in_dir: &PathBuf, out_archive: &PathBuf, sidecar_path: &PathBuf) -> anyhow::Result<()> {
    let sidecar_text = fs::read_to_string(sidecar_path)
        .map_err(|_| ArchiveError::InputNotFound(sidecar_path.clone()))?;
    let sidecar = Sidecar::from_json(&sidecar_text)?;

    let disk_paths: Vec<String> = sidecar
        .entries
        .iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.arc_path.clone())
        .filter(|path| in_dir.join(path).is_file())
        .collect();
    sidecar.validate_against_disk(&disk_paths)?;

    let mut write_entries = Vec::with_capacity(sidecar.entries.len());
    for entry in &sidecar.entries {
        let name = entry
            .arc_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&entry.arc_path)
            .to_string();

        let directory_tail = match &entry.directory_tail {
            Some(hex_str) => {
                let bytes = hex::decode(hex_str)
                    .map_err(|e| ArchiveError::SidecarMismatch(format!("directory_tail: {}", e)))?;
                let mut tail = [0u8; 4];
                tail.copy_from_slice(&bytes);
                tail
            }
            None => [0u8; 4],
        };

        let (locator, data) = if entry.is_dir {
            // The sidecar doesn't carry `locator` directly; rederive it
            // from the path hierarchy, since every child's `arc_path` is
            // `{this dir's arc_path}{name}[/]`.
            let first_child = sidecar
                .entries
                .iter()
                .filter(|e| {
                    e.arc_path.starts_with(&entry.arc_path)
                        && e.arc_path != entry.arc_path
                        && e.arc_path[entry.arc_path.len()..].matches('/').count()
                            <= if e.is_dir { 1 } else { 0 }
                })
                .map(|e| e.entry_index)
                .min()
                .unwrap_or(entry.entry_index);
            (first_child, None)
        } else {
            let offset_index = entry
                .offset_index
                .context("file entry missing offset_index in sidecar")?;
            let path = in_dir.join(&entry.arc_path);
            let data = fs::read(&path)
                .map_err(|_| ArchiveError::SidecarMismatch(format!("missing file {:?}", path)))?;
            (offset_index, Some(data))
        };

        write_entries.push(WriteEntry {
            name,
            entry_index: entry.entry_index,
            size: entry.size,
            is_dir: entry.is_dir,
            locator,
            directory_tail,
            order: entry.order,
            data,
        });
    }

    let bytes = writer::write_plaintext(&write_entries)?;
    File::create(out_archive)?.write_all(&bytes)?;
    println!("{} {:?}", "wrote archive".green(), out_archive);
    Ok(())
}

fn convert(file: &PathBuf) -> anyhow::Result<()> {
    let data = fs::read(file).map_err(|_| ArchiveError::InputNotFound(file.clone()))?;
    let converted = if data.starts_with(image::MGF_PREFIX) {
        image::mgf_to_png(&data)?
    } else if data.starts_with(&image::PNG_SIGNATURE) {
        image::png_to_mgf_fresh(&data)?
    } else {
        return Err(ArchiveError::MalformedArchive(
            "file is neither mgf nor png".into(),
        )
        .into());
    };
    fs::write(file, converted)?;
    println!("{} {:?}", "converted".green(), file);
    Ok(())
}

fn init_progressbar(prefix: &str, size: u64) -> ProgressBar {
    let progress_bar = ProgressBar::new(size).with_style(
        ProgressStyle::default_bar()
            .template(" {spinner} {prefix} {wide_bar:} {pos:>6}/{len:6} ETA:[{eta}]"),
    );
    progress_bar.set_prefix(prefix);
    progress_bar
}
