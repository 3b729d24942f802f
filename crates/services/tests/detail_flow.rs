mod common;

use std::sync::{Arc, Mutex};

use common::{ScriptedApi, empty_enrollment, two_module_course};
use course_core::model::{CourseId, Principal};
use services::{
    CourseDetail, CourseDetailService, DetailError, EnrollmentStatus, ErrorKind, PrimaryAction,
};

#[tokio::test]
async fn no_enrollment_for_course_offers_enroll() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1"), two_module_course("c2")],
        enrollments: Mutex::new(vec![empty_enrollment("u1", two_module_course("c2"))]),
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);
    let viewer = Principal::student("u1");

    let detail = detail_svc
        .load(Some(&viewer), &CourseId::new("c1"))
        .await
        .unwrap();

    assert!(!detail.is_enrolled());
    assert_eq!(detail.primary_action(), Some(PrimaryAction::Enroll));
}

#[tokio::test]
async fn enrolling_flips_gate_and_repeat_is_refused() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1")],
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);
    let viewer = Principal::student("u1");
    let mut detail = detail_svc
        .load(Some(&viewer), &CourseId::new("c1"))
        .await
        .unwrap();

    detail_svc.enroll(Some(&viewer), &mut detail).await.unwrap();
    assert_eq!(detail.primary_action(), Some(PrimaryAction::GoToCourse));

    let err = detail_svc
        .enroll(Some(&viewer), &mut detail)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Already enrolled");
}

#[tokio::test]
async fn anonymous_viewer_must_sign_in() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1")],
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);
    let mut detail = detail_svc.load(None, &CourseId::new("c1")).await.unwrap();

    assert_eq!(detail.primary_action(), Some(PrimaryAction::SignIn));
    let err = detail_svc.enroll(None, &mut detail).await.unwrap_err();
    assert!(matches!(err, DetailError::SignInRequired));
}

#[tokio::test]
async fn failed_enrollment_lookup_leaves_status_unknown() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1")],
        enrollments_error: Some("gateway timeout".into()),
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);

    let detail = detail_svc
        .load(Some(&Principal::student("u1")), &CourseId::new("c1"))
        .await
        .unwrap();

    assert_eq!(detail.status, EnrollmentStatus::Unknown);
    assert_eq!(detail.primary_action(), None);
}

#[tokio::test]
async fn stale_enroll_button_lands_on_go_to_course() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1")],
        enrollments: Mutex::new(vec![empty_enrollment("u1", two_module_course("c1"))]),
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);
    let mut detail = CourseDetail {
        course: two_module_course("c1"),
        status: EnrollmentStatus::NotEnrolled,
    };

    let err = detail_svc
        .enroll(Some(&Principal::student("u1")), &mut detail)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert_eq!(detail.primary_action(), Some(PrimaryAction::GoToCourse));
}

#[tokio::test]
async fn transient_enroll_failure_resets_gate_to_unknown() {
    let api = Arc::new(ScriptedApi {
        courses: vec![two_module_course("c1")],
        enroll_error: Some("Enrolled, but the enrollment could not be reloaded".into()),
        ..ScriptedApi::default()
    });
    let detail_svc = CourseDetailService::new(api);
    let viewer = Principal::student("u1");
    let mut detail = detail_svc
        .load(Some(&viewer), &CourseId::new("c1"))
        .await
        .unwrap();
    assert_eq!(detail.primary_action(), Some(PrimaryAction::Enroll));

    let err = detail_svc
        .enroll(Some(&viewer), &mut detail)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientFailure);
    assert_eq!(detail.status, EnrollmentStatus::Unknown);
    assert_eq!(detail.primary_action(), None);
}
