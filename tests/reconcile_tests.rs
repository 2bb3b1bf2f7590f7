//! Integration tests for decomposition, write-back and op mutation.

use glam::Vec3;
use xformstack::core::MemoryPrim;
use xformstack::prelude::*;
use xformstack::stack::{COMMON_STACK, MAYA_STACK};
use xformstack::util::shear_mat4;

const TOLERANCE: f64 = 1e-5;

fn op(name: &str, precision: Precision) -> XformOp {
    XformOp::parse(name, precision).expect("valid op name")
}

fn vec3d(x: f64, y: f64, z: f64) -> Option<OpValue> {
    Some(OpValue::Vec3d(DVec3::new(x, y, z)))
}

fn writable(prim: MemoryPrim) -> TransformationMatrix<MemoryPrim> {
    let mut xform = TransformationMatrix::new();
    xform.bind(prim);
    xform.enable_push_to_prim(true).expect("resync");
    xform
}

fn names(xform: &TransformationMatrix<MemoryPrim>) -> Vec<String> {
    xform.prim().map(MemoryPrim::op_order_names).unwrap_or_default()
}

fn value(xform: &TransformationMatrix<MemoryPrim>, attr: &str) -> Option<OpValue> {
    xform.prim().and_then(|p| p.value(attr, TimeCode::Default))
}

fn assert_vec3(value: Option<OpValue>, expected: DVec3) {
    let v = value.and_then(|v| v.as_dvec3()).expect("vector value");
    assert!(v.abs_diff_eq(expected, TOLERANCE), "{v:?} != {expected:?}");
}

/// Every slot of the native stack, double precision.
fn full_maya_prim() -> MemoryPrim {
    let d = Precision::Double;
    let rp = op("xformOp:translate:rotatePivot", d);
    let sp = op("xformOp:translate:scalePivot", d);
    MemoryPrim::new("full")
        .with_op(op("xformOp:translate", d), vec3d(1.0, 2.0, 3.0))
        .and_then(|p| p.with_op(op("xformOp:translate:rotatePivotTranslate", d), vec3d(0.5, 0.0, -0.5)))
        .and_then(|p| p.with_op(rp.clone(), vec3d(0.1, 0.2, 0.3)))
        .and_then(|p| p.with_op(op("xformOp:rotateXYZ", d), vec3d(30.0, 45.0, 60.0)))
        .and_then(|p| p.with_op(op("xformOp:rotateXYZ:rotateAxis", d), vec3d(5.0, 10.0, 15.0)))
        .and_then(|p| p.with_op(rp.inverse(), None))
        .and_then(|p| p.with_op(op("xformOp:translate:scalePivotTranslate", d), vec3d(-1.0, 0.0, 1.0)))
        .and_then(|p| p.with_op(sp.clone(), vec3d(0.4, 0.5, 0.6)))
        .and_then(|p| {
            p.with_op(
                op("xformOp:transform:shear", d),
                Some(OpValue::Matrix4d(shear_mat4(DVec3::new(0.1, 0.2, 0.3)))),
            )
        })
        .and_then(|p| p.with_op(op("xformOp:scale", d), vec3d(2.0, 3.0, 4.0)))
        .and_then(|p| p.with_op(sp.inverse(), None))
        .expect("Failed to build prim")
}

#[test]
fn test_roundtrip_full_stack() {
    let original = full_maya_prim();
    let reference = original.local_transformation(TimeCode::Default).expect("composes");
    let mut xform = writable(original.clone());
    assert_eq!(xform.schema(), Some(MAYA_STACK));
    assert!(xform.push_to_prim_enabled());

    // the decomposition composes to the same matrix as the ops
    assert!(xform.as_matrix().abs_diff_eq(reference, TOLERANCE));

    // pushing back changes nothing
    xform.push_to_prim().expect("push");
    assert_eq!(names(&xform), original.op_order_names());
    for name in [
        "xformOp:translate",
        "xformOp:translate:rotatePivotTranslate",
        "xformOp:translate:rotatePivot",
        "xformOp:rotateXYZ",
        "xformOp:rotateXYZ:rotateAxis",
        "xformOp:translate:scalePivotTranslate",
        "xformOp:translate:scalePivot",
        "xformOp:scale",
    ] {
        let before = original.value(name, TimeCode::Default);
        let after = value(&xform, name);
        assert_vec3(after, before.and_then(|v| v.as_dvec3()).expect("authored"));
    }
    let shear = value(&xform, "xformOp:transform:shear")
        .and_then(|v| v.as_dmat4())
        .expect("shear matrix");
    assert!(shear.abs_diff_eq(shear_mat4(DVec3::new(0.1, 0.2, 0.3)), TOLERANCE));
    assert!(xform.tweaks().is_zero());
}

#[test]
fn test_untouched_rotate_axis_keeps_angles() {
    let axis = op("xformOp:rotateXYZ:rotateAxis", Precision::Float);
    let prim = MemoryPrim::new("tilted")
        .with_op(op("xformOp:translate", Precision::Float), Some(OpValue::Vec3f(Vec3::ZERO)))
        .and_then(|p| p.with_op(axis, Some(OpValue::Vec3f(Vec3::new(0.0, 100.0, 0.0)))))
        .expect("Failed to build prim");
    let mut xform = writable(prim);
    assert!(xform.push_to_prim_enabled());

    xform.translate_to(DVec3::new(4.0, 5.0, 6.0)).expect("translate");
    assert_vec3(value(&xform, "xformOp:translate"), DVec3::new(4.0, 5.0, 6.0));
    assert_vec3(value(&xform, "xformOp:rotateXYZ:rotateAxis"), DVec3::new(0.0, 100.0, 0.0));

    // an edited orientation stays near the stored angles
    let tilted = EulerRotation::from_degrees(DVec3::new(0.0, 110.0, 0.0), RotationOrder::Xyz);
    xform.set_rotate_orientation_euler(tilted, false).expect("orient");
    assert_vec3(value(&xform, "xformOp:rotateXYZ:rotateAxis"), DVec3::new(0.0, 110.0, 0.0));
    assert!(xform.tweaks().is_zero());
}

#[test]
fn test_rotate_y_with_shear() {
    let shear = DVec3::new(0.25, 0.5, 0.75);
    let prim = MemoryPrim::new("sheared")
        .with_op(op("xformOp:rotateY", Precision::Float), Some(OpValue::Float(90.0)))
        .and_then(|p| {
            p.with_op(
                op("xformOp:transform:shear", Precision::Double),
                Some(OpValue::Matrix4d(shear_mat4(shear))),
            )
        })
        .expect("Failed to build prim");
    let from_ops = prim.local_transformation(TimeCode::Default).expect("composes");

    let mut xform = TransformationMatrix::new();
    xform.bind(prim);
    assert_eq!(xform.schema(), Some(MAYA_STACK));
    assert!(xform.rotation().to_degrees().abs_diff_eq(DVec3::new(0.0, 90.0, 0.0), TOLERANCE));
    assert!(xform.shear().abs_diff_eq(shear, TOLERANCE));
    assert_eq!(xform.translation(), DVec3::ZERO);

    let direct = DMat4::from_rotation_y(90f64.to_radians()) * shear_mat4(shear);
    assert!(xform.as_matrix().abs_diff_eq(direct, TOLERANCE));
    assert!(from_ops.abs_diff_eq(direct, TOLERANCE));
}

#[test]
fn test_minimal_mutation() {
    let mut xform = writable(MemoryPrim::new("empty"));

    // default values never author ops
    xform.translate_to(DVec3::ZERO).expect("translate");
    xform.scale_to(DVec3::ONE).expect("scale");
    xform.shear_to(DVec3::ZERO).expect("shear");
    xform.set_rotate_pivot(DVec3::ZERO, false).expect("pivot");
    xform.rotate_to(EulerRotation::IDENTITY).expect("rotate");
    assert!(names(&xform).is_empty());

    xform.scale_to(DVec3::splat(2.0)).expect("scale");
    assert_eq!(names(&xform), ["xformOp:scale"]);

    // pivots come in pairs
    xform.set_scale_pivot(DVec3::new(1.0, 0.0, 0.0), false).expect("pivot");
    assert_eq!(
        names(&xform),
        [
            "xformOp:translate:scalePivot",
            "xformOp:scale",
            "!invert!xformOp:translate:scalePivot",
        ]
    );

    xform.shear_to(DVec3::new(0.5, 0.0, 0.0)).expect("shear");
    assert_eq!(
        names(&xform),
        [
            "xformOp:translate:scalePivot",
            "xformOp:transform:shear",
            "xformOp:scale",
            "!invert!xformOp:translate:scalePivot",
        ]
    );
    assert_eq!(xform.schema(), Some(MAYA_STACK));

    // editing an existing op adds nothing
    xform.scale_by(DVec3::splat(2.0)).expect("scale");
    assert_eq!(names(&xform).len(), 4);
    assert_vec3(value(&xform, "xformOp:scale"), DVec3::splat(4.0));
}

#[test]
fn test_pivot_split_once() {
    let pivot = op("xformOp:translate:pivot", Precision::Float);
    let prim = MemoryPrim::new("pivoted")
        .with_op(pivot.clone(), Some(OpValue::Vec3f(Vec3::new(1.0, 2.0, 3.0))))
        .and_then(|p| p.with_op(op("xformOp:rotateXYZ", Precision::Float), Some(OpValue::Vec3f(Vec3::new(0.0, 0.0, 45.0)))))
        .and_then(|p| p.with_op(pivot.inverse(), None))
        .expect("Failed to build prim");
    let mut xform = writable(prim);
    assert_eq!(xform.schema(), Some(COMMON_STACK));
    assert_eq!(xform.rotate_pivot(), xform.scale_pivot());

    // same value keeps the combined op
    xform.set_rotate_pivot(DVec3::new(1.0, 2.0, 3.0), false).expect("pivot");
    assert_eq!(xform.schema(), Some(COMMON_STACK));

    xform.set_rotate_pivot(DVec3::new(4.0, 5.0, 6.0), false).expect("pivot");
    let split = [
        "xformOp:translate:rotatePivot",
        "xformOp:rotateXYZ",
        "!invert!xformOp:translate:rotatePivot",
        "xformOp:translate:scalePivot",
        "!invert!xformOp:translate:scalePivot",
    ];
    assert_eq!(names(&xform), split);
    assert_eq!(xform.schema(), Some(MAYA_STACK));
    assert_vec3(value(&xform, "xformOp:translate:rotatePivot"), DVec3::new(4.0, 5.0, 6.0));
    assert_vec3(value(&xform, "xformOp:translate:scalePivot"), DVec3::new(1.0, 2.0, 3.0));

    // equal again, still split
    xform.set_rotate_pivot(DVec3::new(1.0, 2.0, 3.0), false).expect("pivot");
    assert_eq!(names(&xform), split);
    assert_vec3(value(&xform, "xformOp:translate:rotatePivot"), DVec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_balanced_pivot_keeps_matrix() {
    let prim = MemoryPrim::new("a")
        .with_op(op("xformOp:rotateXYZ", Precision::Double), vec3d(10.0, 20.0, 30.0))
        .and_then(|p| p.with_op(op("xformOp:scale", Precision::Double), vec3d(1.0, 2.0, 3.0)))
        .expect("Failed to build prim");
    let mut xform = writable(prim);
    let before = xform.as_matrix();

    xform.set_rotate_pivot(DVec3::new(1.0, -2.0, 0.5), true).expect("pivot");
    xform.set_scale_pivot(DVec3::new(-1.0, 0.0, 2.0), true).expect("pivot");
    assert!(xform.as_matrix().abs_diff_eq(before, TOLERANCE));

    // the stack agrees with the host view
    let local = xform
        .prim()
        .expect("bound")
        .local_transformation(TimeCode::Default)
        .expect("composes");
    assert!(local.abs_diff_eq(before, TOLERANCE));
    assert_eq!(names(&xform).len(), 8);
}

#[test]
fn test_locked_channel() {
    let mut xform = writable(MemoryPrim::new("a"));
    xform.lock(Channel::Rotate);
    let before = xform.rotation();

    let err = xform.rotate_by(EulerRotation::new(0.1, 0.0, 0.0, RotationOrder::Xyz));
    assert!(matches!(err, Err(Error::Locked(Channel::Rotate))));
    // balancing the orientation touches the rotation too
    let err = xform.set_rotate_orientation(DQuat::from_rotation_x(0.3), true);
    assert!(matches!(err, Err(Error::Locked(Channel::Rotate))));
    assert_eq!(xform.rotation(), before);
    assert!(names(&xform).is_empty());

    xform.unlock(Channel::Rotate);
    xform
        .rotate_by(EulerRotation::new(0.1, 0.0, 0.0, RotationOrder::Xyz))
        .expect("unlocked");
    assert_eq!(names(&xform), ["xformOp:rotateXYZ"]);
}

#[test]
fn test_failed_insert_rolls_back() {
    let mut prim = MemoryPrim::new("a")
        .with_op(op("xformOp:scale", Precision::Float), Some(OpValue::Vec3f(Vec3::splat(2.0))))
        .expect("Failed to build prim");
    prim.limit_op_creation(1);
    let mut xform = writable(prim);

    let err = xform.set_rotate_pivot(DVec3::X, false);
    assert!(matches!(err, Err(Error::OpCreationFailed(_))));
    assert_eq!(names(&xform), ["xformOp:scale"]);
    assert_eq!(xform.entries().len(), 1);
    assert!(!xform.has_channel_op(Channel::RotatePivot));
}

#[test]
fn test_read_only_prim() {
    let prim = MemoryPrim::new("a")
        .with_op(op("xformOp:translate", Precision::Float), Some(OpValue::Vec3f(Vec3::ZERO)))
        .expect("Failed to build prim");
    let mut xform = writable(prim);
    xform.prim_mut().expect("bound").set_read_only(true);

    assert!(matches!(xform.translate_to(DVec3::X), Err(Error::WriteFailed(_))));
    assert!(matches!(xform.scale_to(DVec3::splat(2.0)), Err(Error::ReadOnly)));
}

#[test]
fn test_animated_prim_is_read_only() {
    let translate = op("xformOp:translate", Precision::Float);
    let mut prim = MemoryPrim::new("anim");
    prim.author(&translate, OpValue::Vec3f(Vec3::ZERO)).expect("author");
    prim.set_sample(&translate, 1.0, OpValue::Vec3f(Vec3::ZERO)).expect("sample");
    prim.set_sample(&translate, 2.0, OpValue::Vec3f(Vec3::new(10.0, 0.0, 0.0))).expect("sample");
    let prim = prim
        .with_op(translate, None)
        .and_then(|p| p.with_op(op("xformOp:scale", Precision::Float), Some(OpValue::Vec3f(Vec3::splat(2.0)))))
        .expect("Failed to build prim");

    let mut xform = writable(prim);
    assert!(xform.has_animation());
    assert!(xform.has_animated(Channel::Translate));
    assert!(!xform.has_animated(Channel::Scale));
    assert!(!xform.push_to_prim_enabled());

    // edits are accepted but never written
    xform.translate_by(DVec3::Y).expect("translate");
    xform.scale_to(DVec3::splat(3.0)).expect("scale");
    let prim = xform.prim().expect("bound");
    assert_eq!(prim.value("xformOp:scale", TimeCode::Default), Some(OpValue::Vec3f(Vec3::splat(2.0))));
    assert_eq!(
        prim.value("xformOp:translate", TimeCode::At(2.0)),
        Some(OpValue::Vec3f(Vec3::new(10.0, 0.0, 0.0)))
    );

    xform.update_to_time(TimeCode::At(2.0));
    assert_eq!(xform.translation(), DVec3::new(10.0, 1.0, 0.0));
    assert_eq!(xform.scale(), DVec3::splat(3.0));
    assert_eq!(xform.tweaks().scale, DVec3::ONE);

    xform.update_to_time(TimeCode::At(1.5));
    assert_eq!(xform.translation(), DVec3::new(5.0, 1.0, 0.0));
    assert_eq!(xform.sampled().translation, DVec3::new(5.0, 0.0, 0.0));
}

#[test]
fn test_same_time_update_is_noop() {
    let translate = op("xformOp:translate", Precision::Float);
    let mut prim = MemoryPrim::new("anim");
    prim.author(&translate, OpValue::Vec3f(Vec3::ZERO)).expect("author");
    prim.set_sample(&translate, 1.0, OpValue::Vec3f(Vec3::ZERO)).expect("sample");
    prim.set_sample(&translate, 2.0, OpValue::Vec3f(Vec3::new(10.0, 0.0, 0.0))).expect("sample");
    let prim = prim.with_op(translate.clone(), None).expect("Failed to build prim");

    let mut xform = TransformationMatrix::new();
    xform.bind(prim);
    xform.update_to_time(TimeCode::At(2.0));
    let sampled = *xform.sampled();
    let current = *xform.decomposed();
    assert_eq!(sampled.translation, DVec3::new(10.0, 0.0, 0.0));

    // re-authoring under the current time is not picked up without a time change
    xform
        .prim_mut()
        .expect("bound")
        .set_sample(&translate, 2.0, OpValue::Vec3f(Vec3::new(20.0, 0.0, 0.0)))
        .expect("sample");
    xform.update_to_time(TimeCode::At(2.0));
    assert_eq!(*xform.sampled(), sampled);
    assert_eq!(*xform.decomposed(), current);

    xform.update_to_time(TimeCode::At(1.0));
    xform.update_to_time(TimeCode::At(2.0));
    assert_eq!(xform.translation(), DVec3::new(20.0, 0.0, 0.0));
}

#[test]
fn test_raw_matrix_fallback() {
    // scale before translate matches no schema
    let prim = MemoryPrim::new("raw")
        .with_op(op("xformOp:scale", Precision::Float), Some(OpValue::Vec3f(Vec3::splat(2.0))))
        .and_then(|p| p.with_op(op("xformOp:translate", Precision::Float), Some(OpValue::Vec3f(Vec3::new(1.0, 2.0, 3.0)))))
        .expect("Failed to build prim");
    let reference = prim.local_transformation(TimeCode::Default).expect("composes");

    let mut xform = writable(prim);
    assert_eq!(xform.schema(), None);
    assert!(xform.derived_state().from_matrix);
    assert!(!xform.push_to_prim_enabled());
    assert!(xform.as_matrix().abs_diff_eq(reference, TOLERANCE));
    assert!(xform.translation().abs_diff_eq(DVec3::new(2.0, 4.0, 6.0), TOLERANCE));

    xform.translate_to(DVec3::ZERO).expect("translate");
    assert_eq!(names(&xform), ["xformOp:scale", "xformOp:translate"]);
}

#[test]
fn test_matrix_queries() {
    let prim = MemoryPrim::new("a")
        .with_op(op("xformOp:translate", Precision::Double), vec3d(2.0, 0.0, 0.0))
        .and_then(|p| p.with_op(op("xformOp:scale", Precision::Double), vec3d(3.0, 3.0, 3.0)))
        .expect("Failed to build prim");
    let mut xform = TransformationMatrix::new();
    xform.bind(prim);
    xform.set_local_translate_offset(DVec3::new(1.0, 0.0, 0.0));

    // the offset is in local space, so it is scaled
    let m = xform.as_matrix();
    assert!(m.w_axis.truncate().abs_diff_eq(DVec3::new(5.0, 0.0, 0.0), TOLERANCE));

    assert!(xform.as_matrix_fraction(0.0).abs_diff_eq(DMat4::IDENTITY, TOLERANCE));
    assert!(xform.as_matrix_fraction(1.0).abs_diff_eq(m, TOLERANCE));
    let half = xform.as_matrix_fraction(0.5);
    assert!(half.x_axis.truncate().abs_diff_eq(DVec3::new(2.0, 0.0, 0.0), TOLERANCE));

    assert!(xform.as_matrix_at(TimeCode::At(10.0)).abs_diff_eq(m, TOLERANCE));
}

#[test]
fn test_rebinding_keeps_host_state() {
    let mut xform = TransformationMatrix::new();
    xform.bind(MemoryPrim::new("a"));
    xform.lock(Channel::Scale);
    xform.enable_push_to_prim(true).expect("resync");

    let previous = xform.bind(full_maya_prim()).expect("previous prim");
    assert_eq!(previous.name(), "a");
    assert!(xform.is_locked(Channel::Scale));
    assert!(xform.external_state().push_to_prim);
    assert_eq!(xform.schema(), Some(MAYA_STACK));

    assert!(xform.bind(MemoryPrim::invalid()).is_some());
    assert!(!xform.is_bound());
    assert!(xform.translate_to(DVec3::X).is_ok());
    assert!(xform.unbind().is_none());
}
