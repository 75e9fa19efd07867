//! `execute()`: raw SQL and connection callbacks.

use futures::future::BoxFuture;

use super::MigrationContext;
use crate::error::Result;
use crate::model::{Expression, RawCallback, RawOperation};
use crate::processor::Processor;

pub struct ExecuteBuilder<'a> {
    ctx: &'a mut MigrationContext,
}

impl<'a> ExecuteBuilder<'a> {
    pub(crate) fn new(ctx: &'a mut MigrationContext) -> Self {
        Self { ctx }
    }

    /// SQL sent verbatim.
    pub fn sql(self, sql: impl Into<String>) {
        self.ctx
            .push(Expression::PerformRawOperation(RawOperation::Sql(sql.into())));
    }

    /// Run `callback` against the live processor.
    ///
    /// The callback may do work that does not roll back with the migration.
    /// In preview runs it is reported but not invoked.
    pub fn with_connection<F>(self, description: impl Into<String>, callback: F)
    where
        F: for<'p> Fn(&'p dyn Processor) -> BoxFuture<'p, Result<()>> + Send + Sync + 'static,
    {
        self.ctx
            .push(Expression::PerformRawOperation(RawOperation::Callback(
                RawCallback::new(description, callback),
            )));
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::super::MigrationContext;
    use crate::model::{Expression, RawOperation};

    #[test]
    fn test_sql_and_callback_recorded() {
        let mut ctx = MigrationContext::new("SqlServer");
        ctx.execute().sql("UPDATE [Users] SET [Active] = 1;");
        ctx.execute().with_connection("reindex", |processor| {
            async move { processor.execute("DBCC DBREINDEX('Users');").await }.boxed()
        });

        assert!(matches!(
            &ctx.expressions()[0],
            Expression::PerformRawOperation(RawOperation::Sql(_))
        ));
        match &ctx.expressions()[1] {
            Expression::PerformRawOperation(RawOperation::Callback(callback)) => {
                assert_eq!(callback.description, "reindex")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
