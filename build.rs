//! Build script: stamps BUILD_DATETIME (UTC, minute precision) into the
//! `--version` string.

use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let minute_of_day = (secs % 86_400) / 60;

    println!(
        "cargo:rustc-env=BUILD_DATETIME={:04}-{:02}-{:02} {:02}:{:02} UTC",
        year,
        month,
        day,
        minute_of_day / 60,
        minute_of_day % 60
    );
    println!("cargo:rerun-if-changed=build.rs");
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
