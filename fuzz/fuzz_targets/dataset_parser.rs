#![no_main]

use adaptest::analysis::{analyze, AnalysisConfig};
use adaptest::dataset::Dataset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing must never panic; a parsed dataset must always yield a report
        if let Ok(dataset) = Dataset::from_json_str(input) {
            let mut config = AnalysisConfig::quick();
            config.bootstrap_resamples = 100;
            config.permutation_resamples = 100;
            let report = analyze(&dataset, &config);
            let _ = report.to_json();
        }
    }
});
