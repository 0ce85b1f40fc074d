//! Stock mutation, directory and export tests

mod common;

use uuid::Uuid;

use common::*;
use shared::{ErrorOrigin, NewStockError, StockHistoryFilter};
use stock_ledger_backend::error::AppError;
use stock_ledger_backend::services::directory::{CreateTeamInput, CreateWarehouseInput};
use stock_ledger_backend::services::stock::{CorrectStockInput, CreateStockProductInput, IncrementStockInput};
use stock_ledger_backend::services::{DirectoryService, ReportingService, StockService};

// ============================================================================
// Increment and correction
// ============================================================================

#[tokio::test]
async fn test_increment_records_history() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 10).await;
    let service = StockService::new(repo.clone());

    let input = IncrementStockInput {
        warehouse_id: w1.id,
        team_id: teams[0].id,
        delta: -4,
    };
    let updated = service.increment(product.id, input).await.unwrap();
    assert_eq!(updated.quantity, 6);

    let history = service
        .list_history(&StockHistoryFilter {
            product_id: Some(product.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].quantity, -4);
    assert_eq!(history[0].warehouse_id, w1.id);
    assert_eq!(history[0].team_id, teams[0].id);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 0).await;
    let service = StockService::new(repo.clone());

    for delta in [3, 2, -1] {
        let input = IncrementStockInput {
            warehouse_id: w1.id,
            team_id: teams[0].id,
            delta,
        };
        service.increment(product.id, input).await.unwrap();
    }

    let deltas: Vec<i64> = service
        .list_history(&Default::default())
        .await
        .unwrap()
        .iter()
        .map(|h| h.quantity)
        .collect();
    assert_eq!(deltas, vec![-1, 2, 3]);
    assert_eq!(service.get_product(product.id).await.unwrap().quantity, 4);
}

#[tokio::test]
async fn test_increment_with_wrong_team_is_not_found() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 2).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 10).await;
    let service = StockService::new(repo.clone());

    let input = IncrementStockInput {
        warehouse_id: w1.id,
        team_id: teams[1].id,
        delta: 1,
    };
    assert!(matches!(
        service.increment(product.id, input).await,
        Err(AppError::NotFound(_))
    ));
    assert!(service.list_history(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_increment_below_zero_is_rejected() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 2).await;
    let service = StockService::new(repo.clone());

    let input = IncrementStockInput {
        warehouse_id: w1.id,
        team_id: teams[0].id,
        delta: -3,
    };
    assert!(matches!(
        service.increment(product.id, input).await,
        Err(AppError::InsufficientStock(_))
    ));
    assert_eq!(service.get_product(product.id).await.unwrap().quantity, 2);
    assert!(service.list_history(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overflowing_increment_is_rejected() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", i64::MAX - 1).await;
    let service = StockService::new(repo.clone());

    let input = IncrementStockInput {
        warehouse_id: w1.id,
        team_id: teams[0].id,
        delta: 5,
    };
    assert!(matches!(
        service.increment(product.id, input).await,
        Err(AppError::ValidationError(_))
    ));
    assert_eq!(service.get_product(product.id).await.unwrap().quantity, i64::MAX - 1);
    assert!(service.list_history(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_correction_skips_history() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 2).await;
    let service = StockService::new(repo.clone());

    let input = CorrectStockInput {
        warehouse_id: w1.id,
        team_id: teams[0].id,
        quantity: 40,
    };
    let corrected = service.correct(product.id, input).await.unwrap();
    assert_eq!(corrected.quantity, 40);
    assert!(service.list_history(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_negative_correction_is_rejected() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 2).await;
    let service = StockService::new(repo.clone());

    let input = CorrectStockInput {
        warehouse_id: w1.id,
        team_id: teams[0].id,
        quantity: -1,
    };
    assert!(matches!(
        service.correct(product.id, input).await,
        Err(AppError::Validation { ref field, .. }) if field == "quantity"
    ));
}

#[tokio::test]
async fn test_correction_with_wrong_warehouse_is_not_found() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let (w2, _) = warehouse_with_teams(&repo, "W2", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 2).await;

    let input = CorrectStockInput {
        warehouse_id: w2.id,
        team_id: teams[0].id,
        quantity: 1,
    };
    assert!(matches!(
        StockService::new(repo.clone()).correct(product.id, input).await,
        Err(AppError::NotFound(_))
    ));
}

// ============================================================================
// Stock products
// ============================================================================

#[tokio::test]
async fn test_create_product_joins_its_warehouse() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let service = StockService::new(repo.clone());

    let input = CreateStockProductInput {
        reference: " REF1 ".to_string(),
        denomination: "Widget".to_string(),
        ean: Some("3760000000017".to_string()),
        quantity: 3,
        warehouse_id: w1.id,
        team_id: teams[0].id,
    };
    let product = service.create_product(input.clone()).await.unwrap();
    assert_eq!(product.reference, "REF1");

    let warehouse = repo.get_warehouse(w1.id).await.unwrap().unwrap();
    assert_eq!(warehouse.list_product, vec![product.id]);

    assert!(matches!(
        service.create_product(input).await,
        Err(AppError::Conflict { .. })
    ));
}

#[tokio::test]
async fn test_create_product_in_unknown_warehouse() {
    let repo = memory_repo();
    let team = repo.create_team("Team", &[]).await.unwrap();

    let input = CreateStockProductInput {
        reference: "REF1".to_string(),
        denomination: "Widget".to_string(),
        ean: None,
        quantity: 0,
        warehouse_id: Uuid::new_v4(),
        team_id: team.id,
    };
    assert!(matches!(
        StockService::new(repo.clone()).create_product(input).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_product_leaves_warehouse_list() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let kept = stock(&repo, w1.id, teams[0].id, "REF1", 1).await;
    let removed = stock(&repo, w1.id, teams[0].id, "REF2", 1).await;
    let service = StockService::new(repo.clone());

    service.delete_product(removed.id).await.unwrap();

    let warehouse = repo.get_warehouse(w1.id).await.unwrap().unwrap();
    assert_eq!(warehouse.list_product, vec![kept.id]);
    assert!(matches!(
        service.delete_product(removed.id).await,
        Err(AppError::NotFound(_))
    ));
}

// ============================================================================
// Directory
// ============================================================================

#[tokio::test]
async fn test_assign_team_twice_is_idempotent() {
    let repo = memory_repo();
    let service = DirectoryService::new(repo.clone());
    let team = service
        .create_team(CreateTeamInput {
            name: "Team A".to_string(),
            user_ids: vec![],
        })
        .await
        .unwrap();
    let warehouse = service
        .create_warehouse(CreateWarehouseInput {
            name: "W1".to_string(),
            team_ids: vec![],
        })
        .await
        .unwrap();

    service.assign_team(warehouse.id, team.id).await.unwrap();
    let assigned = service.assign_team(warehouse.id, team.id).await.unwrap();
    assert_eq!(assigned.list_assigned_team, vec![team.id]);

    let unassigned = service.unassign_team(warehouse.id, team.id).await.unwrap();
    assert!(unassigned.list_assigned_team.is_empty());
}

#[tokio::test]
async fn test_create_warehouse_validates_input() {
    let repo = memory_repo();
    let service = DirectoryService::new(repo.clone());

    assert!(matches!(
        service
            .create_warehouse(CreateWarehouseInput {
                name: "  ".to_string(),
                team_ids: vec![],
            })
            .await,
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        service
            .create_warehouse(CreateWarehouseInput {
                name: "W1".to_string(),
                team_ids: vec![Uuid::new_v4()],
            })
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deleting_directory_entries_keeps_products() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let (w2, _) = warehouse_with_teams(&repo, "W2", 0).await;
    repo.assign_team(w2.id, teams[0].id).await.unwrap();
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 4).await;
    let service = DirectoryService::new(repo.clone());

    service.delete_team(teams[0].id).await.unwrap();
    service.delete_warehouse(w1.id).await.unwrap();

    let orphan = repo.get_stock_product(product.id).await.unwrap().unwrap();
    assert_eq!(orphan.warehouse_id, w1.id);
    assert_eq!(orphan.team_id, teams[0].id);
    assert!(service.get_warehouse(w2.id).await.unwrap().list_assigned_team.is_empty());
    assert!(matches!(service.delete_team(teams[0].id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_warehouse_products_follow_listing_order() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let first = stock(&repo, w1.id, teams[0].id, "REF1", 1).await;
    let second = stock(&repo, w1.id, teams[0].id, "REF2", 2).await;

    let products = DirectoryService::new(repo.clone())
        .list_warehouse_products(w1.id)
        .await
        .unwrap();
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_refused_while_errors_unresolved() {
    let repo = memory_repo();
    let (w1, teams) = warehouse_with_teams(&repo, "W1", 1).await;
    let product = stock(&repo, w1.id, teams[0].id, "REF1", 4).await;
    let stored = repo
        .replace_stock_errors(vec![NewStockError {
            origin: ErrorOrigin::Opensi,
            product_ids: vec![product.id],
        }])
        .await
        .unwrap();
    let service = ReportingService::new(repo.clone());

    assert!(matches!(service.export_stock().await, Err(AppError::Conflict { .. })));

    repo.set_stock_error_status(stored[0].id, true).await.unwrap();
    let csv = service.export_stock().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "warehouse;reference;denomination;team;quantity");
    assert_eq!(lines[1], "W1;REF1;REF1 item;W1 team 1;4");
}
