use anyhow::Context;
use clap::Parser;
use rand::Rng;
use rand::rngs::ThreadRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes a random census CSV for benchmarks and demos
#[derive(Parser, Debug)]
#[command(name = "census_generator", version)]
struct Args {
    /// Number of data rows
    #[arg(default_value_t = 100_000)]
    rows: usize,
    /// Output file; kept apart from the real dataset
    #[arg(default_value = "data/synthetic.csv")]
    path: PathBuf,
}

const EDUCATION: [&str; 8] = [
    "HS-grad",
    "Some-college",
    "Bachelors",
    "Masters",
    "Assoc-voc",
    "11th",
    "Doctorate",
    "Prof-school",
];
const RACE: [&str; 5] = [
    "White",
    "Black",
    "Asian-Pac-Islander",
    "Amer-Indian-Eskimo",
    "Other",
];
const COUNTRY: [&str; 8] = [
    "United-States",
    "Mexico",
    "Philippines",
    "Germany",
    "India",
    "Canada",
    "Iran",
    "Taiwan",
];
const OCCUPATION: [&str; 7] = [
    "Prof-specialty",
    "Craft-repair",
    "Exec-managerial",
    "Adm-clerical",
    "Sales",
    "Other-service",
    "Tech-support",
];

fn pick<'a>(rng: &mut ThreadRng, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

fn main() -> anyhow::Result<()> {
    let Args { rows, path } = Args::parse();

    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "age,education,salary,sex,race,native-country,occupation,hours-per-week"
    )?;

    let mut rng = rand::rng();
    for _ in 0..rows {
        let education = pick(&mut rng, &EDUCATION);
        let advanced = matches!(education, "Bachelors" | "Masters" | "Doctorate");
        let rich = rng.random_bool(if advanced { 0.45 } else { 0.15 });
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            rng.random_range(17..91),
            education,
            if rich { ">50K" } else { "<=50K" },
            if rng.random_bool(0.67) { "Male" } else { "Female" },
            pick(&mut rng, &RACE),
            pick(&mut rng, &COUNTRY),
            pick(&mut rng, &OCCUPATION),
            rng.random_range(1..100),
        )?;
    }
    writer.flush()?;

    println!("Sample census CSV generated: {} ({rows} rows)", path.display());
    Ok(())
}
