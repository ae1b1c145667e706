use crate::commands::{with_migrated_pool, CommandResult};
use tally_db::SeedDataset;

pub fn run() -> CommandResult {
    let loaded = with_migrated_pool("seed", |pool| async move {
        let seed_result = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if !verification.all_present {
            return Err(("seed_verification", failure_message(&verification.checks), 6u8));
        }
        Ok(seed_result.rows_checked)
    });

    match loaded {
        Ok(rows_checked) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: masters, price sources, opportunity, work order and pick list ({rows_checked} key rows verified)"
            ),
        ),
        Err(failure) => failure,
    }
}

fn failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
