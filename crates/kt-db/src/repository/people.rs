//! # Person Repository
//!
//! Agents, drivers, staff and freelance agents.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};
use kt_core::{Person, PersonKind};

const ENTITY: &str = "person";

#[derive(Debug, FromRow)]
struct PersonRow {
    id: String,
    kind: String,
    name: String,
}

impl TryFrom<PersonRow> for Person {
    type Error = DbError;

    fn try_from(row: PersonRow) -> DbResult<Self> {
        Ok(Person {
            kind: codec::parsed(ENTITY, "kind", &row.kind)?,
            id: row.id,
            name: row.name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PersonRepository {
    pool: SqlitePool,
}

impl PersonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PersonRepository { pool }
    }

    pub async fn insert(&self, person: &Person) -> DbResult<()> {
        debug!(id = %person.id, kind = %person.kind, "Inserting person");

        sqlx::query("INSERT INTO people (id, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&person.id)
            .bind(person.kind.as_str())
            .bind(&person.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Person>> {
        let row: Option<PersonRow> =
            sqlx::query_as("SELECT id, kind, name FROM people WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Person::try_from).transpose()
    }

    /// Everyone of one kind, by name.
    pub async fn list(&self, kind: PersonKind) -> DbResult<Vec<Person>> {
        let rows: Vec<PersonRow> =
            sqlx::query_as("SELECT id, kind, name FROM people WHERE kind = ?1 ORDER BY name")
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Person::try_from).collect()
    }

    pub async fn rename(&self, id: &str, name: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE people SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Person", id));
        }
        Ok(())
    }

    /// Fails with a foreign key violation while any booking, payment or
    /// expense still points at the person.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting person");

        let result = sqlx::query("DELETE FROM people WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Person", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_insert_and_list_by_kind() {
        let db = test_support::db().await;
        test_support::person(&db, PersonKind::Driver, "Zoltan").await;
        test_support::person(&db, PersonKind::Driver, "Andras").await;
        let agent = test_support::person(&db, PersonKind::Agent, "Eva").await;

        let drivers = db.people().list(PersonKind::Driver).await.unwrap();
        let names: Vec<_> = drivers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Andras", "Zoltan"]);

        assert_eq!(db.people().get(&agent.id).await.unwrap(), Some(agent));
    }

    #[tokio::test]
    async fn test_rename_and_delete_missing() {
        let db = test_support::db().await;
        let staff = test_support::person(&db, PersonKind::Staff, "Kata").await;
        db.people().rename(&staff.id, "Katalin").await.unwrap();
        assert_eq!(db.people().get(&staff.id).await.unwrap().unwrap().name, "Katalin");

        db.people().delete(&staff.id).await.unwrap();
        assert!(matches!(
            db.people().delete(&staff.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
