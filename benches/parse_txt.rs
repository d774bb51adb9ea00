//! Benchmark for loading chart text of every dialect.

use criterion::{Criterion, Throughput};
use songchart::prelude::*;

struct ChartFile {
    name: String,
    source: String,
}

fn scan_chart_files() -> Vec<ChartFile> {
    let dir = "tests/files";
    let extensions = [".txt", ".sm", ".xml"];

    std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && extensions
                    .iter()
                    .any(|ext| path.to_string_lossy().ends_with(ext))
        })
        .filter_map(|path| {
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(String::from)?;

            let source = std::fs::read_to_string(&path).expect("Failed to load test file");

            Some(ChartFile { name, source })
        })
        .collect()
}

/// A long solo chart, since the fixtures only hold a handful of notes.
fn generated_txt(notes: usize) -> String {
    let mut source = String::from("#TITLE:Long\n#ARTIST:Generator\n#BPM:300\n#GAP:500\n");
    for i in 0..notes {
        let ts = i * 4;
        source.push_str(&format!(": {ts} 3 {} la\n", 50 + i % 24));
        if i % 8 == 7 {
            source.push_str(&format!("- {}\n", ts + 3));
        }
    }
    source.push_str("E\n");
    source
}

fn load(name: &str, source: &str) -> Result<Song, LoadError> {
    let mut parser = SongParser::new(format!("songs/Bench/{name}"), default_config());
    parser.load_full_from_text(source)?;
    Ok(parser.into_song())
}

fn bench_load_full(c: &mut Criterion) {
    let mut files = scan_chart_files();
    files.push(ChartFile {
        name: "generated.txt".to_string(),
        source: generated_txt(5_000),
    });
    let mut group = c.benchmark_group("load_full");

    for file in files.iter() {
        group.throughput(Throughput::Bytes(file.source.len() as u64));
        group.bench_function(&file.name, |b| {
            b.iter(|| {
                load(
                    std::hint::black_box(&file.name),
                    std::hint::black_box(&file.source),
                )
            });
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_load_full(&mut criterion);
}
