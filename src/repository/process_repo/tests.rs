use super::{ProcessRepository, ProcessStructureRepository};
use crate::domain::process::{
    CostItem, OverheadItem, Process, ProcessSubprocessLink, Subprocess, SubstituteGroup,
    VariantUsage,
};
use crate::domain::types::{CostCategory, ProcessStatus};
use chrono::Utc;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_process(code: &str) -> Process {
    Process {
        process_id: Uuid::new_v4().to_string(),
        process_code: code.to_string(),
        process_name: format!("工艺-{}", code),
        category: Some("机加工".to_string()),
        status: ProcessStatus::Draft,
        created_by: "tester".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_subprocess(code: &str) -> Subprocess {
    Subprocess {
        subprocess_id: Uuid::new_v4().to_string(),
        subprocess_code: code.to_string(),
        subprocess_name: format!("工序-{}", code),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn insert_variant(conn: &Arc<Mutex<Connection>>, variant_id: &str, code: &str) {
    let guard = conn.lock().unwrap();
    guard
        .execute(
            r#"
            INSERT INTO item_variant (variant_id, variant_code, variant_name, unit,
                current_stock, safety_stock, reorder_point, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'kg', '0', '0', '0', datetime('now'), datetime('now'))
            "#,
            rusqlite::params![variant_id, code, format!("物料-{}", code)],
        )
        .unwrap();
}

#[test]
fn test_insert_and_find_process() {
    let conn = setup_test_db();
    let repo = ProcessRepository::from_connection(conn);

    let process = make_process("PROC-001");
    repo.insert_process(&process).unwrap();

    let found = repo.find_by_id(&process.process_id).unwrap();
    assert!(found.is_some(), "按 ID 应能查到工艺");
    let found = found.unwrap();
    assert_eq!(found.process_code, "PROC-001");
    assert_eq!(found.status, ProcessStatus::Draft);

    let by_code = repo.find_by_code("PROC-001").unwrap();
    assert!(by_code.is_some(), "按编码应能查到工艺");

    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_process_code_unique() {
    let conn = setup_test_db();
    let repo = ProcessRepository::from_connection(conn);

    repo.insert_process(&make_process("PROC-DUP")).unwrap();
    let result = repo.insert_process(&make_process("PROC-DUP"));
    assert!(result.is_err(), "重复编码应触发唯一约束");
}

#[test]
fn test_list_with_status_filter() {
    let conn = setup_test_db();
    let repo = ProcessRepository::from_connection(conn);

    let p1 = make_process("PROC-A");
    let p2 = make_process("PROC-B");
    repo.insert_process(&p1).unwrap();
    repo.insert_process(&p2).unwrap();
    repo.set_status(&p1.process_id, ProcessStatus::Active).unwrap();

    let active = repo.list(Some(ProcessStatus::Active)).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].process_code, "PROC-A");

    let all = repo.list(None).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_link_ordering_and_next_seq_no() {
    let conn = setup_test_db();
    let master = ProcessRepository::from_connection(conn.clone());
    let structure = ProcessStructureRepository::from_connection(conn);

    let process = make_process("PROC-SEQ");
    master.insert_process(&process).unwrap();
    let sp1 = make_subprocess("SP-1");
    let sp2 = make_subprocess("SP-2");
    master.insert_subprocess(&sp1).unwrap();
    master.insert_subprocess(&sp2).unwrap();

    assert_eq!(structure.next_seq_no(&process.process_id).unwrap(), 1);

    structure
        .insert_link(&ProcessSubprocessLink {
            link_id: Uuid::new_v4().to_string(),
            process_id: process.process_id.clone(),
            subprocess_id: sp1.subprocess_id.clone(),
            seq_no: 1,
        })
        .unwrap();
    structure
        .insert_link(&ProcessSubprocessLink {
            link_id: Uuid::new_v4().to_string(),
            process_id: process.process_id.clone(),
            subprocess_id: sp2.subprocess_id.clone(),
            seq_no: 2,
        })
        .unwrap();

    assert_eq!(structure.next_seq_no(&process.process_id).unwrap(), 3);

    let links = structure.list_links(&process.process_id).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].subprocess_id, sp1.subprocess_id);
    assert_eq!(links[1].subprocess_id, sp2.subprocess_id);

    // 同一工序重复挂接应触发唯一约束
    let dup = structure.insert_link(&ProcessSubprocessLink {
        link_id: Uuid::new_v4().to_string(),
        process_id: process.process_id.clone(),
        subprocess_id: sp1.subprocess_id.clone(),
        seq_no: 3,
    });
    assert!(dup.is_err());
}

#[test]
fn test_usage_group_membership() {
    let conn = setup_test_db();
    let master = ProcessRepository::from_connection(conn.clone());
    let structure = ProcessStructureRepository::from_connection(conn.clone());

    let sp = make_subprocess("SP-GRP");
    master.insert_subprocess(&sp).unwrap();
    insert_variant(&conn, "var-1", "V-001");
    insert_variant(&conn, "var-2", "V-002");

    let group = SubstituteGroup {
        group_id: Uuid::new_v4().to_string(),
        subprocess_id: sp.subprocess_id.clone(),
        group_name: "轴承替代组".to_string(),
        created_at: Utc::now(),
    };
    structure.insert_group(&group).unwrap();

    for (usage_id, variant_id) in [("u-1", "var-1"), ("u-2", "var-2")] {
        structure
            .insert_usage(&VariantUsage {
                usage_id: usage_id.to_string(),
                subprocess_id: sp.subprocess_id.clone(),
                variant_id: variant_id.to_string(),
                quantity: dec!(2.5),
                group_id: None,
                created_at: Utc::now(),
            })
            .unwrap();
        structure.set_usage_group(usage_id, Some(&group.group_id)).unwrap();
    }

    assert_eq!(structure.count_group_members(&group.group_id).unwrap(), 2);

    let members = structure.list_usages_by_group(&group.group_id).unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].quantity, dec!(2.5));
    assert!(members.iter().all(|u| u.is_grouped()));
}

#[test]
fn test_cost_item_and_overhead_roundtrip() {
    let conn = setup_test_db();
    let master = ProcessRepository::from_connection(conn.clone());
    let structure = ProcessStructureRepository::from_connection(conn);

    let process = make_process("PROC-COST");
    master.insert_process(&process).unwrap();
    let sp = make_subprocess("SP-COST");
    master.insert_subprocess(&sp).unwrap();

    structure
        .insert_cost_item(&CostItem {
            item_id: "ci-1".to_string(),
            subprocess_id: sp.subprocess_id.clone(),
            item_name: "装配人工".to_string(),
            category: CostCategory::Labor,
            amount: dec!(120.50),
            created_at: Utc::now(),
        })
        .unwrap();

    let items = structure.list_cost_items(&sp.subprocess_id).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].category, CostCategory::Labor);
    assert_eq!(items[0].amount, dec!(120.50));

    structure
        .insert_overhead(&OverheadItem {
            overhead_id: "oh-1".to_string(),
            process_id: process.process_id.clone(),
            item_name: "车间分摊".to_string(),
            amount: dec!(300),
            created_at: Utc::now(),
        })
        .unwrap();

    let overheads = structure.list_overheads(&process.process_id).unwrap();
    assert_eq!(overheads.len(), 1);
    assert_eq!(overheads[0].amount, dec!(300));

    assert_eq!(structure.delete_cost_item("ci-1").unwrap(), 1);
    assert_eq!(structure.delete_overhead("oh-1").unwrap(), 1);
}

#[test]
fn test_groups_for_process_via_links() {
    let conn = setup_test_db();
    let master = ProcessRepository::from_connection(conn.clone());
    let structure = ProcessStructureRepository::from_connection(conn);

    let process = make_process("PROC-G");
    master.insert_process(&process).unwrap();
    let sp = make_subprocess("SP-G");
    master.insert_subprocess(&sp).unwrap();

    structure
        .insert_link(&ProcessSubprocessLink {
            link_id: Uuid::new_v4().to_string(),
            process_id: process.process_id.clone(),
            subprocess_id: sp.subprocess_id.clone(),
            seq_no: 1,
        })
        .unwrap();

    let group = SubstituteGroup {
        group_id: Uuid::new_v4().to_string(),
        subprocess_id: sp.subprocess_id.clone(),
        group_name: "G1".to_string(),
        created_at: Utc::now(),
    };
    structure.insert_group(&group).unwrap();

    let groups = structure.list_groups_for_process(&process.process_id).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_id, group.group_id);
}
