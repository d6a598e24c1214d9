use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use worklogs::auth::{MemoryAuth, User};
use worklogs::data::{MemoryBackend, Operation};
use worklogs::prelude::*;

fn app(backend: &MemoryBackend, auth: &MemoryAuth) -> WorkLogs {
    WorkLogs::with_backends(Arc::new(backend.clone()), Arc::new(auth.clone()), Notifier::default())
}

fn seeded() -> MemoryBackend {
    let today = Utc::now().date_naive();
    let backend = MemoryBackend::new();
    backend.seed(
        "profiles",
        vec![
            json!({ "id": "u1", "full_name": "Ada Lovelace", "role": "admin", "created_at": "2024-01-01T00:00:00Z" }),
            json!({ "id": "u2", "full_name": "Alan Turing", "role": "member", "created_at": "2024-01-02T00:00:00Z" }),
            json!({ "id": "u3", "full_name": "Grace Hopper", "role": "viewer", "created_at": "2024-01-03T00:00:00Z" }),
        ],
    );
    backend.seed(
        "events",
        vec![
            json!({ "id": "e1", "name": "Retro", "date": (today - Duration::days(1)).to_string(), "created_at": "2024-02-01T00:00:00Z" }),
            json!({ "id": "e2", "name": "Hackathon", "date": (today + Duration::days(3)).to_string(), "created_at": "2024-02-02T00:00:00Z" }),
            json!({ "id": "e3", "name": "Offsite", "date": (today + Duration::days(30)).to_string(), "created_at": "2024-02-03T00:00:00Z" }),
        ],
    );
    backend.seed(
        "tasks",
        vec![
            json!({ "id": "t1", "event_id": "e2", "name": "Book venue", "assigned_to": "u2", "status": "completed" }),
            json!({ "id": "t2", "event_id": "e2", "name": "Order food", "assigned_to": "u2", "status": "in_progress" }),
            json!({ "id": "t3", "event_id": "e2", "name": "Print badges", "status": "pending" }),
        ],
    );
    backend.seed(
        "ideas",
        vec![
            json!({ "id": "i1", "event_id": "e2", "person_name": "Ada", "idea_text": "Robots" }),
            json!({ "id": "i2", "event_id": "e2", "person_name": "Alan", "idea_text": "Puzzles" }),
        ],
    );
    backend.seed(
        "work_logs",
        vec![
            json!({ "id": "w1", "event_id": "e2", "task_id": "t1", "person_id": "u2", "name": "Alan", "description": "Called venue", "created_at": "2024-03-01T00:00:00Z" }),
            json!({ "id": "w2", "event_id": "e2", "task_id": "deleted-task", "person_id": "u2", "name": "Alan", "description": "Menu", "created_at": "2024-03-02T00:00:00Z" }),
        ],
    );
    backend
}

#[tokio::test]
async fn permissions_follow_profile_role() {
    let backend = seeded();
    let cases = [
        ("u1", Some(Role::Admin), Permission::ALL.to_vec()),
        (
            "u2",
            Some(Role::Member),
            vec![Permission::EditOwn, Permission::ViewOwn, Permission::CreateWorkLogs],
        ),
        ("u3", None, vec![Permission::ViewOwn]),
    ];

    for (user_id, role, expected) in cases {
        let auth = MemoryAuth::signed_in(User::new(user_id, "someone@example.com"));
        let mut resolver = app(&backend, &auth).permissions();
        resolver.fetch().await.unwrap();

        assert_eq!(resolver.role(), role, "user {}", user_id);
        let granted: Vec<_> = Permission::ALL
            .iter()
            .copied()
            .filter(|p| resolver.has_permission(*p))
            .collect();
        assert_eq!(granted, expected, "user {}", user_id);
    }
}

#[tokio::test]
async fn navigation_hides_gated_entries_for_members() {
    let backend = seeded();
    let auth = MemoryAuth::signed_in(User::new("u2", "alan@example.com"));
    let app = app(&backend, &auth);
    let mut resolver = app.permissions();
    resolver.fetch().await.unwrap();

    let visible = app.navigation().visible(|p| resolver.has_permission(p));
    let names: Vec<_> = visible.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Dashboard", "Events", "Work Logs"]);
}

#[tokio::test]
async fn cascade_survives_failed_task_delete() {
    let backend = seeded();
    backend.fail("tasks", Operation::Delete, "tasks table locked");
    let auth = MemoryAuth::signed_in(User::new("u1", "ada@example.com"));
    let app = app(&backend, &auth);

    let mut events = app.events();
    events.fetch().await.unwrap();
    let hackathon = events.events().iter().find(|e| e.id == "e2").unwrap().clone();

    let outcome = events
        .delete_event(&app.cascade(), &|_: &str| true, &hackathon)
        .await
        .unwrap();
    let DeleteOutcome::Deleted(report) = outcome else {
        panic!("deletion was confirmed");
    };

    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.ideas.result, Ok(2));
    assert_eq!(report.work_logs.result, Ok(2));
    assert!(backend.rows("ideas").is_empty());
    assert!(backend.rows("work_logs").is_empty());
    assert_eq!(backend.rows("tasks").len(), 3);
    assert!(events.events().iter().all(|e| e.id != "e2"));
    assert_eq!(
        app.notifier().current()[0].description.as_deref(),
        Some("Event deleted successfully")
    );
}

#[tokio::test]
async fn empty_description_never_reaches_backend() {
    let backend = seeded();
    let auth = MemoryAuth::signed_in(User::new("u2", "alan@example.com"));
    let mut logs = app(&backend, &auth).work_logs();

    let err = logs
        .create_work_log(NewWorkLog {
            event_id: "e2".into(),
            person: "Alan".into(),
            description: String::new(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Missing required fields: description");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn dangling_task_reference_reads_unknown_task() {
    let backend = seeded();
    let auth = MemoryAuth::signed_in(User::new("u2", "alan@example.com"));
    let mut logs = app(&backend, &auth).event_work_logs("e2");
    logs.fetch().await.unwrap();

    let w2 = logs.work_logs().iter().find(|l| l.log.id == "w2").unwrap();
    assert_eq!(w2.task_name, "Unknown Task");
    assert_eq!(w2.event_name, "Hackathon");
}

#[tokio::test]
async fn event_summaries_classify_by_date() {
    let backend = seeded();
    let auth = MemoryAuth::new();
    let mut events = app(&backend, &auth).events();
    events.fetch().await.unwrap();

    let summaries = events.summaries(Utc::now().date_naive()).await.unwrap();
    let status_of = |name: &str| {
        summaries
            .iter()
            .find(|s| s.event.name == name)
            .map(|s| (s.status, s.task_count))
            .unwrap()
    };
    assert_eq!(status_of("Retro"), (EventStatus::Completed, 0));
    assert_eq!(status_of("Hackathon"), (EventStatus::Active, 3));
    assert_eq!(status_of("Offsite"), (EventStatus::Upcoming, 0));
}

#[tokio::test]
async fn team_and_dashboard_for_admin() {
    let backend = seeded();
    let auth = MemoryAuth::signed_in(User::new("u1", "ada@example.com"));
    let app = app(&backend, &auth);
    let mut resolver = app.permissions();
    resolver.fetch().await.unwrap();

    let mut team = app.team();
    team.fetch(resolver.permissions()).await.unwrap();
    let alan = team.members().iter().find(|m| m.profile.id == "u2").unwrap();
    assert_eq!((alan.tasks_assigned, alan.tasks_completed), (2, 1));

    let stats = app.dashboard().stats().await.unwrap();
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.active_tasks, 2);
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.team_members, 3);

    let mut settings = app.settings();
    settings
        .update(resolver.permissions(), "welcome_message", "Hello crew")
        .unwrap();
    assert_eq!(settings.config().welcome_message, "Hello crew");
}
