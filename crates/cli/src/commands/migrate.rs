use crate::commands::{with_migrated_pool, CommandResult};
use tally_db::migrations;

pub fn run() -> CommandResult {
    let applied = with_migrated_pool("migrate", |pool| async move {
        migrations::applied_versions(&pool)
            .await
            .map_err(|error| ("migration_state", error.to_string(), 5u8))
    });

    match applied {
        Ok(versions) => CommandResult::success(
            "migrate",
            format!("applied pending migrations; schema versions: {}", render_versions(&versions)),
        ),
        Err(failure) => failure,
    }
}

fn render_versions(versions: &[i64]) -> String {
    if versions.is_empty() {
        return "<none>".to_string();
    }
    versions.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::render_versions;

    #[test]
    fn versions_render_in_order_or_as_none() {
        assert_eq!(render_versions(&[1, 2]), "1, 2");
        assert_eq!(render_versions(&[]), "<none>");
    }
}
