//! Built-in migrations for trying the tool against an empty database.

use schema_migrate::builder::MigrationContext;
use schema_migrate::migration::{Migration, MigrationRegistry, TagGroup};
use schema_migrate::{Result, Value};

struct CreateCustomers;

impl Migration for CreateCustomers {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Customers")
            .with_column("Id")
            .as_int32()
            .primary_key()
            .identity()
            .with_column("Name")
            .as_string_sized(200)
            .not_nullable()
            .with_column("Email")
            .as_string_sized(256)
            .nullable()
            .unique();
    }
}

struct CreateOrders;

impl Migration for CreateOrders {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.create()
            .table("Orders")
            .with_column("Id")
            .as_int64()
            .primary_key()
            .identity()
            .with_column("CustomerId")
            .as_int32()
            .not_nullable()
            .references("Customers", "Id")
            .indexed()
            .with_column("Total")
            .as_decimal_with(19, 4)
            .not_nullable()
            .with_default_value(0);
    }
}

struct SeedCustomers;

impl Migration for SeedCustomers {
    fn up(&self, ctx: &mut MigrationContext) {
        ctx.insert()
            .into_table("Customers")
            .row([("Name", Value::from("Ada")), ("Email", Value::from("ada@example.com"))])
            .row([("Name", Value::from("Linus")), ("Email", Value::Null)]);
    }

    fn down(&self, ctx: &mut MigrationContext) -> Result<()> {
        ctx.delete_data()
            .from_table("Customers")
            .row([("Name", Value::from("Ada"))])
            .row([("Name", Value::from("Linus"))]);
        Ok(())
    }
}

/// The demo registry: two tables plus sample rows tagged `Demo`.
pub fn registry() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry
        .add(20240101000000, CreateCustomers)
        .describe("Create customers");
    registry
        .add(20240102000000, CreateOrders)
        .describe("Create orders");
    registry
        .add(20240103000000, SeedCustomers)
        .describe("Seed sample customers")
        .tagged(TagGroup::any(["Demo"]));
    registry
}
