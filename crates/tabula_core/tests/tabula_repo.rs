mod common;

use common::{create_user, solid_png, WHITE};
use tabula_core::db::open_db_in_memory;
use tabula_core::model::tabula::TabulaValidationError;
use tabula_core::raster::PixelRect;
use tabula_core::repo::workflow_repo::WorkflowRecord;
use tabula_core::workflow::OpaqueState;
use tabula_core::{
    Color, GridPoint, Mask, RepoError, SqliteTabulaRepository, SqliteUserRepository,
    SqliteWorkflowStateRepository, Tabula, TabulaRepository, Token, User, UserRepository,
    WorkflowStateRepository,
};

fn sample_tabula(owner: &User, name: &str) -> Tabula {
    let mut tabula = Tabula::new(owner.id, name, solid_png(20, 20, WHITE));
    tabula.dpi = 12.5;
    tabula.offset_x = 3;
    tabula.offset_y = -4;
    tabula.grid_color = Some(Color::rgba(10, 20, 30, 128));
    tabula.set_mask(Mask {
        name: "fog".to_string(),
        order: 2,
        color: Color::BLACK,
        rect: PixelRect::new(-5, 0, 10, 8),
        clear: false,
    });
    tabula.set_mask(Mask {
        name: "reveal".to_string(),
        order: 3,
        color: Color::CLEAR,
        rect: PixelRect::new(1, 1, 2, 2),
        clear: true,
    });
    let mut goblin = Token::new(GridPoint::new(1, -2), Color::RED);
    goblin.size = 2;
    goblin.glyph = Some("goblin".to_string());
    goblin.label = Some("G1".to_string());
    tabula.place_token("session-1", "goblin", goblin);
    tabula.set_mark("session-1", GridPoint::new(0, 0), Color::WHITE);
    tabula
}

#[test]
fn create_and_get_roundtrip_keeps_overlays() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let repo = SqliteTabulaRepository::new(&conn);

    let tabula = sample_tabula(&owner, "crypt");
    let id = repo.create_tabula(&tabula).unwrap();

    let loaded = repo.get_tabula(id).unwrap().unwrap();
    assert_eq!(loaded, tabula);
    assert_eq!(
        repo.find_tabula(owner.id, " crypt ").unwrap().map(|t| t.id),
        Some(id)
    );
}

#[test]
fn save_replaces_overlays_and_geometry() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let repo = SqliteTabulaRepository::new(&conn);

    let mut tabula = sample_tabula(&owner, "crypt");
    repo.create_tabula(&tabula).unwrap();

    tabula.dpi = 50.0;
    tabula.remove_mask("fog");
    tabula.place_token("session-1", "goblin", Token::new(GridPoint::new(5, 5), Color::BLACK));
    assert_eq!(tabula.clear_marks("session-1"), 1);
    repo.save_tabula(&tabula).unwrap();

    let loaded = repo.get_tabula(tabula.id).unwrap().unwrap();
    assert_eq!(loaded.dpi, 50.0);
    assert_eq!(loaded.masks().len(), 1);
    assert_eq!(loaded.tokens().count(), 1);
    assert_eq!(
        loaded.token("session-1", "goblin").map(|t| t.point),
        Some(GridPoint::new(5, 5))
    );
    assert_eq!(loaded.marks().count(), 0);
}

#[test]
fn duplicate_names_per_owner_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let other = create_user(&conn, "player");
    let repo = SqliteTabulaRepository::new(&conn);

    repo.create_tabula(&sample_tabula(&owner, "crypt")).unwrap();
    let err = repo
        .create_tabula(&sample_tabula(&owner, "crypt"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)));

    repo.create_tabula(&sample_tabula(&other, "crypt")).unwrap();
    assert_eq!(repo.list_tabulas(owner.id).unwrap().len(), 1);
    assert_eq!(repo.list_tabulas(other.id).unwrap().len(), 1);
}

#[test]
fn invalid_tabulas_never_reach_sql() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let repo = SqliteTabulaRepository::new(&conn);

    let mut tabula = sample_tabula(&owner, "crypt");
    tabula.dpi = f64::NAN;
    assert!(matches!(
        repo.create_tabula(&tabula),
        Err(RepoError::Validation(TabulaValidationError::InvalidDpi(_)))
    ));
    assert!(repo.list_tabulas(owner.id).unwrap().is_empty());
}

#[test]
fn saving_a_missing_tabula_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let repo = SqliteTabulaRepository::new(&conn);

    let err = repo.save_tabula(&sample_tabula(&owner, "ghost")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "tabula", .. }));
}

#[test]
fn deleting_a_tabula_cascades() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let repo = SqliteTabulaRepository::new(&conn);

    let tabula = sample_tabula(&owner, "crypt");
    repo.create_tabula(&tabula).unwrap();
    repo.delete_tabula(tabula.id).unwrap();

    assert!(repo.get_tabula(tabula.id).unwrap().is_none());
    let tokens: i64 = conn
        .query_row("SELECT COUNT(*) FROM tokens;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(tokens, 0);
}

#[test]
fn user_handles_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::new(&conn);
    let first = create_user(&conn, "gm");

    assert!(matches!(
        users.create_user(&User::new("gm")),
        Err(RepoError::Duplicate(_))
    ));
    assert!(matches!(
        users.create_user(&User::new("  ")),
        Err(RepoError::InvalidData(_))
    ));
    assert_eq!(users.find_user_by_handle("gm").unwrap(), Some(first));
}

#[test]
fn workflow_state_upserts_per_user_and_workflow() {
    let conn = open_db_in_memory().unwrap();
    let owner = create_user(&conn, "gm");
    let states = SqliteWorkflowStateRepository::new(&conn);

    let mut record = WorkflowRecord {
        user_id: owner.id,
        workflow: "align".to_string(),
        state: "confirm".to_string(),
        opaque: OpaqueState::from_bytes(b"{\"version\":1,\"state\":null}".to_vec()),
    };
    states.save_state(&record).unwrap();
    record.state = "vertical_a".to_string();
    states.save_state(&record).unwrap();

    let loaded = states.load_state(owner.id, "ALIGN").unwrap().unwrap();
    assert_eq!(loaded, record);
    assert!(states.delete_state(owner.id, "align").unwrap());
    assert!(!states.delete_state(owner.id, "align").unwrap());
    assert!(states.load_state(owner.id, "align").unwrap().is_none());
}
