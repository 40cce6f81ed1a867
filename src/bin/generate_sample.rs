use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Columns of the sample runs: name, unit, equilibrium value, relaxation rate, noise.
const QUANTITIES: [(&str, &str, f64, f64, f64); 5] = [
    ("TEMPERATURE", "K", 300.0, 0.02, 2.5),
    ("PRESSURE", "bar", 1.0, 0.05, 40.0),
    ("E(QM)", "kcal/mol", -1250.0, 0.01, 1.5),
    ("VOLUME", "A^3", 27000.0, 0.005, 15.0),
    ("DENSITY", "g/cm^3", 0.997, 0.005, 0.0005),
];

const STEPS_PER_RUN: usize = 2000;
const TIME_STEP_FS: f64 = 0.5;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One simulation run: a time column plus one column per quantity.
struct Run {
    time: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

/// Each quantity relaxes towards its equilibrium value with noise on top,
/// continuing from `start` (the last values of the previous run).
fn simulate(rng: &mut SimpleRng, first_step: usize, start: &[f64]) -> Run {
    let time = (first_step..first_step + STEPS_PER_RUN)
        .map(|step| step as f64 * TIME_STEP_FS)
        .collect();

    let columns = QUANTITIES
        .iter()
        .zip(start)
        .map(|(&(_, _, target, rate, noise), &initial)| {
            let mut value = initial;
            (0..STEPS_PER_RUN)
                .map(|_| {
                    value += rate * (target - value) + rng.gauss(0.0, noise * rate.sqrt());
                    value + rng.gauss(0.0, noise * 0.2)
                })
                .collect()
        })
        .collect();

    Run { time, columns }
}

fn info_file() -> String {
    let mut cells = vec![format!("SIMULATION-TIME {:>12.2} fs", 0.0)];
    cells.extend(
        QUANTITIES
            .iter()
            .map(|(name, unit, target, _, _)| format!("{name:<15} {target:>12.3} {unit}")),
    );

    let rule = "-".repeat(74);
    let mut out = format!("{rule}\n| {:^70} |\n{rule}\n", "PQ info file");
    for pair in cells.chunks(2) {
        let left = &pair[0];
        let right = pair.get(1).map(String::as_str).unwrap_or("");
        out.push_str(&format!("| {left:<34} | {right:<33} |\n"));
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

fn energy_file(run: &Run) -> String {
    let mut out = String::new();
    for (row, t) in run.time.iter().enumerate() {
        let _ = write!(out, "{t:>12.2}");
        for column in &run.columns {
            let _ = write!(out, " {:>16.6}", column[row]);
        }
        out.push('\n');
    }
    out
}

fn write_parquet(path: &str, runs: &[Run]) -> Result<()> {
    let unit_field = |name: &str, unit: &str| {
        Field::new(name, DataType::Float64, false)
            .with_metadata(HashMap::from([("unit".to_string(), unit.to_string())]))
    };

    let mut fields = vec![unit_field("SIMULATION-TIME", "fs")];
    fields.extend(QUANTITIES.iter().map(|(name, unit, ..)| unit_field(name, unit)));
    let schema = Arc::new(Schema::new(fields));

    let mut arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(
        runs.iter().flat_map(|r| r.time.iter().copied()).collect::<Vec<_>>(),
    ))];
    for idx in 0..QUANTITIES.len() {
        let values: Vec<f64> = runs.iter().flat_map(|r| r.columns[idx].iter().copied()).collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("Failed to create RecordBatch")?;
    let file = std::fs::File::create(path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // The first run starts hot and away from equilibrium, the second continues from it.
    let start: Vec<f64> = QUANTITIES
        .iter()
        .map(|(_, _, target, _, noise)| target + 10.0 * noise)
        .collect();
    let first = simulate(&mut rng, 0, &start);
    let resume: Vec<f64> = first.columns.iter().filter_map(|c| c.last().copied()).collect();
    let second = simulate(&mut rng, STEPS_PER_RUN, &resume);

    let info = info_file();
    for (name, run) in [("md-01", &first), ("md-02", &second)] {
        std::fs::write(format!("{name}.info"), &info).with_context(|| format!("writing {name}.info"))?;
        std::fs::write(format!("{name}.en"), energy_file(run)).with_context(|| format!("writing {name}.en"))?;
    }

    let parquet_path = "md-energy.parquet";
    write_parquet(parquet_path, &[first, second])?;

    println!(
        "Wrote md-01.en, md-02.en ({STEPS_PER_RUN} steps each, {} quantities) and {parquet_path}",
        QUANTITIES.len()
    );
    Ok(())
}
