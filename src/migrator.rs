use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_document_sequences_table::Migration),
            Box::new(m20260101_000002_create_stock_items_table::Migration),
            Box::new(m20260101_000003_create_machines_table::Migration),
            Box::new(m20260101_000004_create_bom_tables::Migration),
            Box::new(m20260101_000005_create_sales_order_tables::Migration),
            Box::new(m20260101_000006_create_work_order_tables::Migration),
        ]
    }
}

/// Audit columns shared by every mutable table.
fn audit_columns(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Audit::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Audit::ModifiedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(ColumnDef::new(Audit::CreatedBy).string().not_null())
        .col(ColumnDef::new(Audit::ModifiedBy).string().not_null())
}

#[derive(Iden)]
enum Audit {
    CreatedAt,
    ModifiedAt,
    CreatedBy,
    ModifiedBy,
}

mod m20260101_000001_create_document_sequences_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_document_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentSequences::Scope)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentSequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DocumentSequences {
        Table,
        Scope,
        LastValue,
    }
}

mod m20260101_000002_create_stock_items_table {
    use super::audit_columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_stock_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(StockItems::Table)
                .if_not_exists()
                .col(ColumnDef::new(StockItems::Id).uuid().primary_key().not_null())
                .col(
                    ColumnDef::new(StockItems::Sku)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(StockItems::Name).string().not_null())
                .col(ColumnDef::new(StockItems::Unit).string().not_null())
                .col(
                    ColumnDef::new(StockItems::QuantityOnHand)
                        .decimal()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(StockItems::ReorderLevel)
                        .decimal()
                        .not_null()
                        .default(0),
                );
            audit_columns(&mut table);

            manager.create_table(table.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum StockItems {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        QuantityOnHand,
        ReorderLevel,
    }
}

mod m20260101_000003_create_machines_table {
    use super::audit_columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_machines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(Machines::Table)
                .if_not_exists()
                .col(ColumnDef::new(Machines::Id).uuid().primary_key().not_null())
                .col(ColumnDef::new(Machines::Code).string().not_null().unique_key())
                .col(ColumnDef::new(Machines::Name).string().not_null())
                .col(ColumnDef::new(Machines::Department).string().null())
                .col(ColumnDef::new(Machines::Status).string().not_null())
                .col(
                    ColumnDef::new(Machines::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Machines::MaintenanceIntervalDays)
                        .integer()
                        .null(),
                )
                .col(ColumnDef::new(Machines::LastMaintenanceDate).date().null())
                .col(ColumnDef::new(Machines::NextMaintenanceDate).date().null());
            audit_columns(&mut table);

            manager.create_table(table.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_machines_next_maintenance_date")
                        .table(Machines::Table)
                        .col(Machines::NextMaintenanceDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Machines::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Machines {
        Table,
        Id,
        Code,
        Name,
        Department,
        Status,
        IsActive,
        MaintenanceIntervalDays,
        LastMaintenanceDate,
        NextMaintenanceDate,
    }
}

mod m20260101_000004_create_bom_tables {
    use super::audit_columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_bom_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut boms = Table::create();
            boms.table(Boms::Table)
                .if_not_exists()
                .col(ColumnDef::new(Boms::Id).uuid().primary_key().not_null())
                .col(ColumnDef::new(Boms::BomNumber).string().not_null().unique_key())
                .col(ColumnDef::new(Boms::ProductCode).string().not_null())
                .col(ColumnDef::new(Boms::Name).string().not_null())
                .col(ColumnDef::new(Boms::Version).integer().not_null().default(1))
                .col(
                    ColumnDef::new(Boms::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                );
            audit_columns(&mut boms);
            manager.create_table(boms.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_boms_product_version")
                        .table(Boms::Table)
                        .col(Boms::ProductCode)
                        .col(Boms::Version)
                        .unique()
                        .to_owned(),
                )
                .await?;

            let mut components = Table::create();
            components
                .table(BomComponents::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(BomComponents::Id)
                        .uuid()
                        .primary_key()
                        .not_null(),
                )
                .col(ColumnDef::new(BomComponents::BomId).uuid().not_null())
                .col(
                    ColumnDef::new(BomComponents::SequenceOrder)
                        .integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(BomComponents::ComponentType)
                        .string()
                        .not_null(),
                )
                .col(ColumnDef::new(BomComponents::ReferenceId).uuid().null())
                .col(ColumnDef::new(BomComponents::Operation).string().null())
                .col(ColumnDef::new(BomComponents::Quantity).decimal().not_null())
                .col(ColumnDef::new(BomComponents::Unit).string().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_bom_components_bom")
                        .from(BomComponents::Table, BomComponents::BomId)
                        .to(Boms::Table, Boms::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            audit_columns(&mut components);
            manager.create_table(components.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bom_components_sequence")
                        .table(BomComponents::Table)
                        .col(BomComponents::BomId)
                        .col(BomComponents::SequenceOrder)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomComponents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Boms::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Boms {
        Table,
        Id,
        BomNumber,
        ProductCode,
        Name,
        Version,
        IsActive,
    }

    #[derive(Iden)]
    pub enum BomComponents {
        Table,
        Id,
        BomId,
        SequenceOrder,
        ComponentType,
        ReferenceId,
        Operation,
        Quantity,
        Unit,
    }
}

mod m20260101_000005_create_sales_order_tables {
    use super::audit_columns;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_sales_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut orders = Table::create();
            orders
                .table(SalesOrders::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(SalesOrders::Id)
                        .uuid()
                        .primary_key()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SalesOrders::OrderNumber)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(SalesOrders::CustomerName).string().not_null())
                .col(ColumnDef::new(SalesOrders::CustomerEmail).string().not_null())
                .col(ColumnDef::new(SalesOrders::Status).string().not_null())
                .col(ColumnDef::new(SalesOrders::DueDate).date().not_null())
                .col(
                    ColumnDef::new(SalesOrders::ConfirmedAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(SalesOrders::ShippedAt)
                        .timestamp_with_time_zone()
                        .null(),
                );
            audit_columns(&mut orders);
            manager.create_table(orders.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_status_due")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::Status)
                        .col(SalesOrders::DueDate)
                        .to_owned(),
                )
                .await?;

            let mut lines = Table::create();
            lines
                .table(SalesOrderLines::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(SalesOrderLines::Id)
                        .uuid()
                        .primary_key()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SalesOrderLines::SalesOrderId)
                        .uuid()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SalesOrderLines::LineNumber)
                        .integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SalesOrderLines::ProductCode)
                        .string()
                        .not_null(),
                )
                .col(ColumnDef::new(SalesOrderLines::Quantity).decimal().not_null())
                .col(ColumnDef::new(SalesOrderLines::WorkOrderId).uuid().null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sales_order_lines_order")
                        .from(SalesOrderLines::Table, SalesOrderLines::SalesOrderId)
                        .to(SalesOrders::Table, SalesOrders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            audit_columns(&mut lines);
            manager.create_table(lines.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesOrderLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum SalesOrders {
        Table,
        Id,
        OrderNumber,
        CustomerName,
        CustomerEmail,
        Status,
        DueDate,
        ConfirmedAt,
        ShippedAt,
    }

    #[derive(Iden)]
    pub enum SalesOrderLines {
        Table,
        Id,
        SalesOrderId,
        LineNumber,
        ProductCode,
        Quantity,
        WorkOrderId,
    }
}

mod m20260101_000006_create_work_order_tables {
    use super::audit_columns;
    use super::m20260101_000002_create_stock_items_table::StockItems;
    use super::m20260101_000003_create_machines_table::Machines;
    use super::m20260101_000004_create_bom_tables::{BomComponents, Boms};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000006_create_work_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut work_orders = Table::create();
            work_orders
                .table(WorkOrders::Table)
                .if_not_exists()
                .col(ColumnDef::new(WorkOrders::Id).uuid().primary_key().not_null())
                .col(
                    ColumnDef::new(WorkOrders::OrderNumber)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(WorkOrders::BomId).uuid().not_null())
                .col(ColumnDef::new(WorkOrders::SalesOrderLineId).uuid().null())
                .col(ColumnDef::new(WorkOrders::Status).string().not_null())
                .col(ColumnDef::new(WorkOrders::Priority).string().not_null())
                .col(
                    ColumnDef::new(WorkOrders::QuantityOrdered)
                        .decimal()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::QuantityCompleted)
                        .decimal()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(WorkOrders::PlannedStart)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::PlannedEnd)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::ActualStart)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::ActualEnd)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(ColumnDef::new(WorkOrders::Notes).text().null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_work_orders_bom")
                        .from(WorkOrders::Table, WorkOrders::BomId)
                        .to(Boms::Table, Boms::Id),
                );
            audit_columns(&mut work_orders);
            manager.create_table(work_orders.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_work_orders_status")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::Status)
                        .to_owned(),
                )
                .await?;

            let mut subs = Table::create();
            subs.table(SubWorkOrders::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(SubWorkOrders::Id)
                        .uuid()
                        .primary_key()
                        .not_null(),
                )
                .col(ColumnDef::new(SubWorkOrders::WorkOrderId).uuid().not_null())
                .col(
                    ColumnDef::new(SubWorkOrders::BomComponentId)
                        .uuid()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::SequenceOrder)
                        .integer()
                        .not_null(),
                )
                .col(ColumnDef::new(SubWorkOrders::MachineId).uuid().null())
                .col(ColumnDef::new(SubWorkOrders::Status).string().not_null())
                .col(ColumnDef::new(SubWorkOrders::Quantity).decimal().not_null())
                .col(
                    ColumnDef::new(SubWorkOrders::OutputQuantity)
                        .decimal()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::ScrapQuantity)
                        .decimal()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::PlannedStart)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::PlannedEnd)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::ActualStart)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(SubWorkOrders::ActualEnd)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_work_orders_work_order")
                        .from(SubWorkOrders::Table, SubWorkOrders::WorkOrderId)
                        .to(WorkOrders::Table, WorkOrders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_work_orders_component")
                        .from(SubWorkOrders::Table, SubWorkOrders::BomComponentId)
                        .to(BomComponents::Table, BomComponents::Id),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_sub_work_orders_machine")
                        .from(SubWorkOrders::Table, SubWorkOrders::MachineId)
                        .to(Machines::Table, Machines::Id),
                );
            audit_columns(&mut subs);
            manager.create_table(subs.to_owned()).await?;

            manager
                .create_table(
                    Table::create()
                        .table(WorkOrderOutputs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WorkOrderOutputs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOutputs::SubWorkOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOutputs::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOutputs::QualityStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WorkOrderOutputs::Notes).text().null())
                        .col(
                            ColumnDef::new(WorkOrderOutputs::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WorkOrderOutputs::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_work_order_outputs_sub")
                                .from(WorkOrderOutputs::Table, WorkOrderOutputs::SubWorkOrderId)
                                .to(SubWorkOrders::Table, SubWorkOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            let mut allocations = Table::create();
            allocations
                .table(MaterialAllocations::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(MaterialAllocations::Id)
                        .uuid()
                        .primary_key()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(MaterialAllocations::WorkOrderId)
                        .uuid()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(MaterialAllocations::StockItemId)
                        .uuid()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(MaterialAllocations::RequiredQuantity)
                        .decimal()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(MaterialAllocations::AllocatedQuantity)
                        .decimal()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_material_allocations_work_order")
                        .from(MaterialAllocations::Table, MaterialAllocations::WorkOrderId)
                        .to(WorkOrders::Table, WorkOrders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_material_allocations_stock_item")
                        .from(MaterialAllocations::Table, MaterialAllocations::StockItemId)
                        .to(StockItems::Table, StockItems::Id),
                );
            audit_columns(&mut allocations);
            manager.create_table(allocations.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_allocations_unique")
                        .table(MaterialAllocations::Table)
                        .col(MaterialAllocations::WorkOrderId)
                        .col(MaterialAllocations::StockItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialAllocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrderOutputs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SubWorkOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum WorkOrders {
        Table,
        Id,
        OrderNumber,
        BomId,
        SalesOrderLineId,
        Status,
        Priority,
        QuantityOrdered,
        QuantityCompleted,
        PlannedStart,
        PlannedEnd,
        ActualStart,
        ActualEnd,
        Notes,
    }

    #[derive(Iden)]
    enum SubWorkOrders {
        Table,
        Id,
        WorkOrderId,
        BomComponentId,
        SequenceOrder,
        MachineId,
        Status,
        Quantity,
        OutputQuantity,
        ScrapQuantity,
        PlannedStart,
        PlannedEnd,
        ActualStart,
        ActualEnd,
    }

    #[derive(Iden)]
    enum WorkOrderOutputs {
        Table,
        Id,
        SubWorkOrderId,
        Quantity,
        QualityStatus,
        Notes,
        RecordedAt,
        CreatedBy,
    }

    #[derive(Iden)]
    enum MaterialAllocations {
        Table,
        Id,
        WorkOrderId,
        StockItemId,
        RequiredQuantity,
        AllocatedQuantity,
    }
}
