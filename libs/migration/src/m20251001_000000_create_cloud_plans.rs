use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CloudPlans::Table)
                    .if_not_exists()
                    .col(pk_uuid(CloudPlans::Id))
                    .col(string_len(CloudPlans::Provider, 32))
                    .col(string_len(CloudPlans::Name, 255))
                    .col(string_len(CloudPlans::Region, 100))
                    .col(string_len(CloudPlans::OperatingSystem, 16).default("Linux"))
                    .col(integer(CloudPlans::Cpu))
                    // double precision keeps synced floats bit-for-bit
                    .col(double(CloudPlans::RamGb))
                    .col(double_null(CloudPlans::StorageGb))
                    .col(double_null(CloudPlans::BandwidthTb))
                    .col(double(CloudPlans::PriceHourly))
                    .col(double(CloudPlans::PriceMonthly))
                    .col(string_len(CloudPlans::Type, 16).default("VM"))
                    .col(
                        timestamp_with_time_zone(CloudPlans::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(CloudPlans::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cloud_plans_provider")
                    .table(CloudPlans::Table)
                    .col(CloudPlans::Provider)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cloud_plans_region")
                    .table(CloudPlans::Table)
                    .col(CloudPlans::Region)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cloud_plans_cpu_ram")
                    .table(CloudPlans::Table)
                    .col(CloudPlans::Cpu)
                    .col(CloudPlans::RamGb)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CloudPlans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CloudPlans {
    Table,
    Id,
    Provider,
    Name,
    Region,
    OperatingSystem,
    Cpu,
    RamGb,
    StorageGb,
    BandwidthTb,
    PriceHourly,
    PriceMonthly,
    Type,
    CreatedAt,
    UpdatedAt,
}
