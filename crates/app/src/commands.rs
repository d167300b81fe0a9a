//! Subcommand handlers.
//!
//! Writes to the expense list go through a [`SyncController`], the same
//! way an interactive front end would: open the month, wait for the first
//! snapshot, apply the change optimistically and wait until the store
//! settles it. Read-only views query the store directly.

use std::path::Path;

use chrono::Utc;
use chrono_tz::Tz;
use engine::{
    Aggregator, Cursor, EngineError, ExpenseRecord, Money, Month, NewExpense, Notice, RecordId,
    RecordStore, SalaryBook, Scope, SortOrder, SqliteStore, SyncController, month_summary, sorted,
    year_totals,
};
use serde_json::Value;

use crate::{
    cli::{Command, CursorArgs, SalaryAction},
    error::{AppError, Result},
};

pub struct Context {
    pub store: SqliteStore,
    pub owner: String,
    pub tz: Tz,
    pub symbol: String,
}

impl Context {
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Add { label, amount, at } => self.add(&label, amount, at).await,
            Command::List { at, sort } => self.list(at, sort).await,
            Command::Remove { id } => self.remove(RecordId::new(id)).await,
            Command::Salary { action } => match action {
                SalaryAction::Get { at } => self.salary_get(at).await,
                SalaryAction::Set { amount, at } => self.salary_set(amount, at).await,
            },
            Command::Summary { at } => self.summary(at).await,
            Command::Year { year } => self.year(year).await,
            Command::Detail { month, year } => self.detail(month, year).await,
            Command::Watch { at } => self.watch(at).await,
            Command::Import { file } => self.import(&file).await,
        }
    }

    fn cursor(&self, at: CursorArgs) -> Result<Cursor> {
        let mut cursor = Cursor::current(self.tz);
        if let Some(number) = at.month {
            cursor = cursor.with_month(Month::from_number(number)?);
        }
        if let Some(year) = at.year {
            cursor = cursor.with_year(year);
        }
        Ok(cursor)
    }

    fn money(&self, amount: Money) -> String {
        amount.format(&self.symbol)
    }

    async fn add(&self, label: &str, amount: Money, at: CursorArgs) -> Result<()> {
        let cursor = self.cursor(at)?;
        let draft = NewExpense::new(&self.owner, label, amount, cursor, Utc::now())?;

        let mut controller = self.open(cursor).await?;
        let temp_id = controller.insert(draft)?;
        tracing::debug!(%temp_id, "expense queued");

        match settle(&mut controller).await? {
            Notice::Inserted(id) => {
                println!("added {id} ({} in {cursor})", self.money(amount));
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn list(&self, at: CursorArgs, sort: SortOrder) -> Result<()> {
        let cursor = self.cursor(at)?;
        let records = self.store.query(&Scope::new(&self.owner, cursor)).await?;
        if records.is_empty() {
            println!("no expenses in {cursor}");
            return Ok(());
        }
        for record in sorted(&records, sort) {
            self.print_record(record);
        }
        Ok(())
    }

    async fn remove(&self, id: RecordId) -> Result<()> {
        let records = self.store.owner_records(&self.owner).await?;
        let record = records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))?;

        match (record.month, record.year) {
            (Some(month), Some(year)) => {
                let mut controller = self.open(Cursor::new(month, year)).await?;
                controller.remove(&id)?;
                match settle(&mut controller).await? {
                    Notice::Removed(_) => {}
                    other => return Err(unexpected(other)),
                }
            }
            // Records without an explicit month never match a subscription.
            _ => self.store.delete(&id).await?,
        }
        println!("removed {id}");
        Ok(())
    }

    async fn salary_get(&self, at: CursorArgs) -> Result<()> {
        let cursor = self.cursor(at)?;
        let book = SalaryBook::load(self.store.clone(), &self.owner).await?;
        match book.map().get(cursor.year, cursor.month) {
            Some(amount) => println!("salary {cursor}: {}", self.money(amount)),
            None => println!("salary {cursor}: unset"),
        }
        Ok(())
    }

    async fn salary_set(&self, amount: Money, at: CursorArgs) -> Result<()> {
        let cursor = self.cursor(at)?;
        let mut book = SalaryBook::load(self.store.clone(), &self.owner).await?;
        book.write_salary(cursor.year, cursor.month, amount).await?;
        println!("salary {cursor}: {}", self.money(amount));
        Ok(())
    }

    async fn summary(&self, at: CursorArgs) -> Result<()> {
        let cursor = self.cursor(at)?;
        let records = self.store.query(&Scope::new(&self.owner, cursor)).await?;
        let book = SalaryBook::load(self.store.clone(), &self.owner).await?;
        self.print_summary(cursor, &records, &book);
        Ok(())
    }

    async fn year(&self, year: Option<i32>) -> Result<()> {
        let year = year.unwrap_or_else(|| Cursor::current(self.tz).year);
        let records = self.store.owner_records(&self.owner).await?;
        let book = SalaryBook::load(self.store.clone(), &self.owner).await?;
        let series = Aggregator::new(self.tz).year_series(&records, book.map(), year);

        println!(
            "{:<10} {:>16} {:>16} {:>16} {:>16}",
            year, "expense", "salary", "remaining", "balance"
        );
        for entry in &series {
            println!(
                "{:<10} {:>16} {:>16} {:>16} {:>16}",
                entry.month.label(),
                self.money(entry.expense),
                self.money(entry.salary),
                self.money(entry.remainder),
                self.money(entry.remainder_signed),
            );
        }

        let totals = year_totals(&series);
        let breakdown = totals.breakdown();
        println!();
        println!("total salary   {}", self.money(totals.total_salary));
        println!("total expense  {}", self.money(totals.total_expense));
        println!("balance        {}", self.money(totals.remainder));
        println!(
            "breakdown      salary {} / expense {} / remaining {}",
            self.money(breakdown.salary),
            self.money(breakdown.expense),
            self.money(breakdown.remaining),
        );
        Ok(())
    }

    async fn detail(&self, month: u8, year: Option<i32>) -> Result<()> {
        let month = Month::from_number(month)?;
        let year = year.unwrap_or_else(|| Cursor::current(self.tz).year);
        let records = self.store.owner_records(&self.owner).await?;
        let detail = Aggregator::new(self.tz).month_detail(&records, month, year);

        println!("{} {year}", month.label());
        if detail.is_empty() {
            println!("no expenses");
            return Ok(());
        }
        for record in &detail {
            self.print_record(record);
        }
        let total: Money = detail.iter().map(|record| record.amount).sum();
        println!("total {}", self.money(total));
        Ok(())
    }

    async fn watch(&self, at: CursorArgs) -> Result<()> {
        let cursor = self.cursor(at)?;
        let mut book = SalaryBook::load(self.store.clone(), &self.owner).await?;
        let mut controller = SyncController::new(self.store.clone());
        controller.set_scope(Some(Scope::new(&self.owner, cursor)))?;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                notice = controller.process_next() => match notice {
                    Some(Notice::Refreshed(_)) => {
                        // Salary writes do not trigger snapshots; reread
                        // the document so the summary stays current.
                        match SalaryBook::load(self.store.clone(), &self.owner).await {
                            Ok(fresh) => book = fresh,
                            Err(err) => tracing::warn!("watch: salary reload failed: {err}"),
                        }
                        let records: Vec<ExpenseRecord> =
                            controller.expense_records().cloned().collect();
                        for record in &records {
                            self.print_record(record);
                        }
                        self.print_summary(cursor, &records, &book);
                        println!("--");
                    }
                    Some(Notice::Failed(err)) => tracing::error!("watch: {err}"),
                    Some(_) => {}
                    None => break,
                },
            }
        }

        controller.logout();
        Ok(())
    }

    async fn import(&self, path: &Path) -> Result<()> {
        let raw = tokio::fs::read_to_string(path).await?;
        let documents = match serde_json::from_str::<Value>(&raw)? {
            Value::Array(items) => items,
            other => vec![other],
        };

        let (imported, skipped) = self.import_documents(&documents).await?;
        println!("imported {imported}, skipped {skipped}");
        Ok(())
    }

    /// Insert each document, skipping the ones that fail validation.
    /// Returns `(imported, skipped)`; a store failure aborts the import.
    async fn import_documents(&self, documents: &[Value]) -> Result<(usize, usize)> {
        let mut imported = 0usize;
        let mut skipped = 0usize;
        for (index, document) in documents.iter().enumerate() {
            let draft = match NewExpense::from_document(document, &self.owner) {
                Ok(draft) => draft,
                Err(err) => {
                    tracing::warn!(index, "skipping document: {err}");
                    skipped += 1;
                    continue;
                }
            };
            match self.store.insert(draft).await {
                Ok(id) => {
                    tracing::debug!(index, %id, "document imported");
                    imported += 1;
                }
                Err(err) if err.is_validation() => {
                    tracing::warn!(index, "skipping document: {err}");
                    skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::info!(imported, skipped, "import finished");
        Ok((imported, skipped))
    }

    /// A controller subscribed to `cursor` that has received its first
    /// snapshot.
    async fn open(&self, cursor: Cursor) -> Result<SyncController<SqliteStore>> {
        let mut controller = SyncController::new(self.store.clone());
        controller.set_scope(Some(Scope::new(&self.owner, cursor)))?;
        loop {
            match controller.process_next().await {
                Some(Notice::Refreshed(_)) => return Ok(controller),
                Some(Notice::Failed(err)) => return Err(err.into()),
                Some(_) => continue,
                None => return Err(closed()),
            }
        }
    }

    fn print_record(&self, record: &ExpenseRecord) {
        let date = record
            .occurred_at
            .map(|ts| ts.with_timezone(&self.tz).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {date:<10}  {:>16}  {}",
            record.id,
            self.money(record.amount),
            record.label
        );
    }

    fn print_summary(&self, cursor: Cursor, records: &[ExpenseRecord], book: &SalaryBook<SqliteStore>) {
        let summary = month_summary(records, book.map(), cursor.month, cursor.year);
        println!("{cursor}");
        println!("salary   {}", self.money(summary.salary));
        println!("expenses {}", self.money(summary.total_expense));
        if summary.is_overspent() {
            println!("balance  {} (overspent)", self.money(summary.remainder));
        } else {
            println!("balance  {}", self.money(summary.remainder));
        }
    }
}

/// Wait for the write in flight to be confirmed or rejected. Snapshots
/// arriving meanwhile are applied along the way.
async fn settle(controller: &mut SyncController<SqliteStore>) -> Result<Notice> {
    loop {
        match controller.process_next().await {
            Some(Notice::Failed(err)) => return Err(err.into()),
            Some(notice @ (Notice::Inserted(_) | Notice::Removed(_))) => return Ok(notice),
            Some(_) => continue,
            None => return Err(closed()),
        }
    }
}

fn unexpected(notice: Notice) -> AppError {
    AppError::Usage(format!("unexpected sync notice: {notice:?}"))
}

fn closed() -> AppError {
    AppError::Usage("sync channel closed".to_string())
}
