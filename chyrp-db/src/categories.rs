use crate::{
    client::{DbClient, Result, key},
    record::CategoryRecord,
};
use chyrp_common::model::category::{Category, CategoryMarker, CategoryName, SeedReport};
use sqlx::{Postgres, Transaction, query_as};

impl DbClient {
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let records = query_as::<_, CategoryRecord>(
            "
            SELECT categories.category_snowflake, categories.name
            FROM posts.categories
            ORDER BY categories.name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let categories = records
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<_, _>>()?;

        Ok(categories)
    }

    /// Makes sure every category in `names` exists. Safe to run repeatedly.
    pub async fn seed_categories(&self, names: &[CategoryName]) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let mut tx = self.pool.begin().await?;

        for name in names {
            let (category, created) = self.find_or_create_category_in(&mut tx, name).await?;
            if created {
                report.created.push(category.name);
            } else {
                report.existing.push(category.name);
            }
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn find_or_create_category_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &CategoryName,
    ) -> Result<(Category, bool)> {
        let category_id = self.next_id::<CategoryMarker>()?;

        let inserted = query_as::<_, CategoryRecord>(
            "
            INSERT INTO posts.categories (category_snowflake, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING category_snowflake, name
            ",
        )
        .bind(key(category_id))
        .bind(name.get())
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(record) = inserted {
            return Ok((record.try_into()?, true));
        }

        let existing = query_as::<_, CategoryRecord>(
            "
            SELECT categories.category_snowflake, categories.name
            FROM posts.categories
            WHERE categories.name = $1
            ",
        )
        .bind(name.get())
        .fetch_one(&mut **tx)
        .await?;

        Ok((existing.try_into()?, false))
    }
}
