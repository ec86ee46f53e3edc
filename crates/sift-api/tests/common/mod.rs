#![allow(dead_code)]

use sift_api::{ChunkedColumn, Table};
use sift_types::F16;

/// Deterministic stand-in for a taxi trips extract.
pub struct TaxiTrips {
    pub taxi_id: Vec<i32>,
    pub fare: Vec<f64>,
    pub trip_seconds: Vec<u32>,
    pub passengers: Vec<u8>,
    pub tip_ratio: Vec<F16>,
}

impl TaxiTrips {
    pub fn generate(rows: usize) -> Self {
        let mut state: u64 = 0x5eed_cafe_f00d_0001;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u32
        };
        let mut trips = Self {
            taxi_id: Vec::with_capacity(rows),
            fare: Vec::with_capacity(rows),
            trip_seconds: Vec::with_capacity(rows),
            passengers: Vec::with_capacity(rows),
            tip_ratio: Vec::with_capacity(rows),
        };
        for _ in 0..rows {
            trips.taxi_id.push((next() % 2000) as i32);
            trips.fare.push(f64::from(next() % 10_000) / 100.0);
            trips.trip_seconds.push(next() % 7200);
            trips.passengers.push((next() % 6) as u8 + 1);
            trips.tip_ratio.push(F16::from_f32((next() % 400) as f32 / 1000.0));
        }
        trips
    }

    /// Table with chunk lengths cycling through `lens`.
    pub fn table(&self, lens: &[usize]) -> Table {
        Table::from_columns(vec![
            ("taxi_id", split(&self.taxi_id, lens)),
            ("fare", split(&self.fare, lens)),
            ("trip_seconds", split(&self.trip_seconds, lens)),
            ("passengers", split(&self.passengers, lens)),
            ("tip_ratio", split(&self.tip_ratio, lens)),
        ])
        .unwrap()
    }
}

fn split<T: sift_types::NativeType>(values: &[T], lens: &[usize]) -> ChunkedColumn {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &len in lens.iter().cycle() {
        if start >= values.len() {
            break;
        }
        let end = (start + len).min(values.len());
        chunks.push(&values[start..end]);
        start = end;
    }
    ChunkedColumn::from_slices(&chunks)
}
