use crate::entities::{courses, prelude::*};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tracing::info;

/// Course catalog used when the database starts empty
const DEFAULT_COURSES: [(&str, &str, &str, &str); 6] = [
    ("10111", "מבוא למדעי המחשב", "האוניברסיטה הפתוחה", "2026א"),
    ("10142", "מבני נתונים", "האוניברסיטה הפתוחה", "2026א"),
    ("20109", "אלגברה לינארית 1", "האוניברסיטה הפתוחה", "2026א"),
    ("20474", "חשבון אינפיניטסימלי 1", "האוניברסיטה הפתוחה", "2026א"),
    ("20407", "מבני נתונים ומבוא לאלגוריתמים", "האוניברסיטה הפתוחה", "2026ב"),
    ("20441", "מבוא למדעי המחשב ושפת Java", "האוניברסיטה הפתוחה", "2026ב"),
];

pub async fn seed_courses(db: &DatabaseConnection) -> anyhow::Result<()> {
    if Courses::find().count(db).await? > 0 {
        return Ok(());
    }

    info!("🌱 Seeding course catalog...");

    for (code, name, institution, semester) in DEFAULT_COURSES {
        courses::ActiveModel {
            course_code: Set(code.to_string()),
            course_name: Set(name.to_string()),
            institution: Set(institution.to_string()),
            semester: Set(semester.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    info!("✅ Seeded {} courses", DEFAULT_COURSES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::run_migrations;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_seeds_only_empty_catalog() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_migrations(&db).await.unwrap();

        seed_courses(&db).await.unwrap();
        seed_courses(&db).await.unwrap();

        assert_eq!(
            Courses::find().count(&db).await.unwrap(),
            DEFAULT_COURSES.len() as u64
        );
    }
}
