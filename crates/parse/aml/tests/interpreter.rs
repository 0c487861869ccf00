//! End-to-end evaluation of small definition blocks.

mod common;

use common::*;
use hadron_aml::{AmlError, InterpreterConfig, LookupMode, NameString, Object, WalkAction};

fn int(value: Object) -> u64 {
    match value {
        Object::Integer(v) => v,
        other => panic!("expected an integer, got {other:?}"),
    }
}

#[test]
fn method_returns_named_integer() {
    let aml = cat(&[
        &name(b"FOO_", &byte(0x2A)),
        &method(b"BAR_", 0, &ret(b"FOO_")),
    ]);
    let interp = load(&aml);
    let value = interp.evaluate(&path("\\BAR"), Vec::new()).unwrap();
    assert_eq!(int(value), 42);
}

#[test]
fn method_fails_when_name_is_missing() {
    let interp = load(&method(b"BAR_", 0, &ret(b"FOO_")));
    let err = interp.evaluate(&path("\\BAR"), Vec::new()).unwrap_err();
    assert!(matches!(err, AmlError::ObjectNotFound(_)), "{err:?}");
}

#[test]
fn relative_names_search_enclosing_scopes() {
    let aml = scope(
        b"_SB_",
        &cat(&[
            &name(b"VAL_", &byte(5)),
            &device(b"DEV0", &method(b"GET_", 0, &ret(b"VAL_"))),
        ]),
    );
    let interp = load(&aml);
    assert_eq!(int(interp.evaluate(&path("\\_SB.DEV0.GET"), Vec::new()).unwrap()), 5);

    let (found, object) = interp
        .find_object(&path("\\_SB.DEV0"), &NameString::parse_str("VAL").unwrap(), LookupMode::Search)
        .unwrap();
    assert_eq!(found, path("\\_SB.VAL"));
    assert!(matches!(object, Object::Integer(5)));

    let err = interp
        .find_object(&path("\\_SB.DEV0"), &NameString::parse_str("VAL").unwrap(), LookupMode::NoSearch)
        .unwrap_err();
    assert!(matches!(err, AmlError::ObjectNotFound(_)));
}

#[test]
fn while_loop_sums_arguments() {
    // Method(SUM_, 1) {
    //     Local0 = 0; Local1 = 0
    //     While (Local1 < Arg0) { Local1++; Local0 += Local1 }
    //     Return (Local0)
    // }
    let body = cat(&[
        &store(ZERO, LOCAL0),
        &store(ZERO, LOCAL1),
        &while_(
            &cat(&[&[0x95], LOCAL1, ARG0]),
            &cat(&[&[0x75], LOCAL1, &[0x72], LOCAL0, LOCAL1, LOCAL0]),
        ),
        &ret(LOCAL0),
    ]);
    let interp = load(&method(b"SUM_", 1, &body));
    let value = interp
        .evaluate(&path("\\SUM"), vec![Object::Integer(4)])
        .unwrap();
    assert_eq!(int(value), 10);
}

#[test]
fn break_leaves_loop() {
    // Local0 = 0; While (One) { If (Local0 == 3) { Break } Local0++ }; Return (Local0)
    let body = cat(&[
        &store(ZERO, LOCAL0),
        &while_(
            ONE,
            &cat(&[
                &if_(&cat(&[&[0x93], LOCAL0, &byte(3)]), &[0xA5]),
                &[0x75],
                LOCAL0,
            ]),
        ),
        &ret(LOCAL0),
    ]);
    let interp = load(&method(b"BRK0", 0, &body));
    assert_eq!(int(interp.evaluate(&path("\\BRK0"), Vec::new()).unwrap()), 3);
}

#[test]
fn else_branch_runs_when_predicate_is_false() {
    // If (Arg0) { Return (1) } Else { Return (2) }
    let body = cat(&[&if_(ARG0, &ret(ONE)), &else_(&ret(&byte(2)))]);
    let interp = load(&method(b"SEL0", 1, &body));
    let eval = |arg| int(interp.evaluate(&path("\\SEL0"), vec![Object::Integer(arg)]).unwrap());
    assert_eq!(eval(1), 1);
    assert_eq!(eval(0), 2);
}

#[test]
fn runaway_loop_is_aborted() {
    let config = InterpreterConfig::default().with_max_loop_iterations(10);
    let interp = load_with(config, &method(b"SPIN", 0, &while_(ONE, &[0xA3])));
    let err = interp.evaluate(&path("\\SPIN"), Vec::new()).unwrap_err();
    assert_eq!(err, AmlError::LoopLimitExceeded);
}

#[test]
fn uninitialized_local_read_fails() {
    let interp = load(&method(b"BAD0", 0, &ret(LOCAL1)));
    let err = interp.evaluate(&path("\\BAD0"), Vec::new()).unwrap_err();
    assert_eq!(err, AmlError::UninitializedLocal(1));
}

#[test]
fn return_at_table_level_is_rejected() {
    let interp = hadron_aml::Interpreter::new(FakeHandler::new(), InterpreterConfig::default());
    assert_eq!(interp.load_table(&ret(ONE)), Err(AmlError::ReturnOutsideMethod));
}

#[test]
fn concatenate_follows_first_operand() {
    let aml = cat(&[
        &method(b"CAT0", 0, &ret(&cat(&[&[0x73], &string("AB"), &word(0x1234), NULL_TARGET]))),
        &method(b"CAT1", 0, &ret(&cat(&[&[0x73], &buffer(&[1, 2]), &byte(3), NULL_TARGET]))),
    ]);
    let interp = load(&aml);

    let value = interp.evaluate(&path("\\CAT0"), Vec::new()).unwrap();
    assert_eq!(value.as_string().unwrap(), "AB0000000000001234");

    let value = interp.evaluate(&path("\\CAT1"), Vec::new()).unwrap();
    let bytes = value.as_buffer().unwrap();
    assert_eq!(bytes.len(), 10);
    assert_eq!(&bytes[..3], &[1, 2, 3]);
}

#[test]
fn index_is_bounds_checked() {
    // Name(PKG_, Package() { 1, 2 })
    // Method(IDX0, 1) { Return (DerefOf (Index (PKG_, Arg0))) }
    let aml = cat(&[
        &name(b"PKG_", &package(&[ONE, &byte(2)])),
        &method(b"IDX0", 1, &ret(&cat(&[&[0x83, 0x88], b"PKG_", ARG0, NULL_TARGET]))),
    ]);
    let interp = load(&aml);
    let eval = |i| interp.evaluate(&path("\\IDX0"), vec![Object::Integer(i)]);

    assert_eq!(int(eval(1).unwrap()), 2);
    assert_eq!(
        eval(2).unwrap_err(),
        AmlError::IndexOutOfBounds { index: 2, len: 2 }
    );
}

#[test]
fn index_store_updates_buffer_byte() {
    // Name(BUF_, Buffer() { 1, 2, 3 })
    // Method(SET0) { Store (0x7F, Index (BUF_, 1)) }
    let aml = cat(&[
        &name(b"BUF_", &buffer(&[1, 2, 3])),
        &method(
            b"SET0",
            0,
            &store(&byte(0x7F), &cat(&[&[0x88], b"BUF_", ONE, NULL_TARGET])),
        ),
    ]);
    let interp = load(&aml);
    interp.evaluate(&path("\\SET0"), Vec::new()).unwrap();
    let value = interp.evaluate(&path("\\BUF"), Vec::new()).unwrap();
    assert_eq!(value.as_buffer().unwrap(), &[1, 0x7F, 3]);
}

#[test]
fn store_converts_to_target_type() {
    // Name(INT0, 0)  Method(SET0) { Store ("1F", INT0) }
    let aml = cat(&[
        &name(b"INT0", ZERO),
        &method(b"SET0", 0, &store(&string("1F"), b"INT0")),
    ]);
    let interp = load(&aml);
    interp.evaluate(&path("\\SET0"), Vec::new()).unwrap();
    assert_eq!(int(interp.evaluate(&path("\\INT0"), Vec::new()).unwrap()), 0x1F);
}

#[test]
fn reference_argument_writes_through() {
    // Name(VAL0, 0)
    // Method(SETR, 1) { Store (7, Arg0) }
    // Method(CALL) { SETR (RefOf (VAL0)) Return (VAL0) }
    let aml = cat(&[
        &name(b"VAL0", ZERO),
        &method(b"SETR", 1, &store(&byte(7), ARG0)),
        &method(
            b"CALL",
            0,
            &cat(&[b"SETR", &[0x71], b"VAL0", &ret(b"VAL0")]),
        ),
    ]);
    let interp = load(&aml);
    assert_eq!(int(interp.evaluate(&path("\\CALL"), Vec::new()).unwrap()), 7);
}

#[test]
fn cond_ref_of_reports_existence() {
    // Method(HAS0) { Return (CondRefOf (NOPE, Local0)) }
    // Method(HAS1) { Return (CondRefOf (HAS0, Local0)) }
    let aml = cat(&[
        &method(b"HAS0", 0, &ret(&cat(&[&[0x5B, 0x12], b"NOPE", LOCAL0]))),
        &method(b"HAS1", 0, &ret(&cat(&[&[0x5B, 0x12], b"HAS0", LOCAL0]))),
    ]);
    let interp = load(&aml);
    assert_eq!(int(interp.evaluate(&path("\\HAS0"), Vec::new()).unwrap()), 0);
    assert_eq!(int(interp.evaluate(&path("\\HAS1"), Vec::new()).unwrap()), u64::MAX);
}

#[test]
fn divide_by_zero_fails() {
    // Divide (1, Arg0, Local0, Local1)
    let interp = load(&method(
        b"DIV0",
        1,
        &cat(&[&[0x78], ONE, ARG0, LOCAL0, LOCAL1, &ret(LOCAL1)]),
    ));
    let err = interp
        .evaluate(&path("\\DIV0"), vec![Object::Integer(0)])
        .unwrap_err();
    assert_eq!(err, AmlError::DivideByZero);
}

#[test]
fn revision_one_tables_use_32_bit_integers() {
    let interp = hadron_aml::Interpreter::new(FakeHandler::new(), InterpreterConfig::default());
    interp
        .load_table_with_revision(&method(b"ONES", 0, &ret(ONES)), 1)
        .unwrap();
    assert_eq!(int(interp.evaluate(&path("\\ONES"), Vec::new()).unwrap()), 0xFFFF_FFFF);
}

#[test]
fn osi_answers_from_configured_interfaces() {
    let config = InterpreterConfig::default().with_os_interface("Hadron");
    let aml = cat(&[
        &method(b"OSI0", 0, &ret(&cat(&[b"\\_OSI", &string("Windows 2015")]))),
        &method(b"OSI1", 0, &ret(&cat(&[b"\\_OSI", &string("Linux")]))),
        &method(b"OSI2", 0, &ret(&cat(&[b"\\_OSI", &string("Hadron")]))),
    ]);
    let interp = load_with(config, &aml);
    assert_ne!(int(interp.evaluate(&path("\\OSI0"), Vec::new()).unwrap()), 0);
    assert_eq!(int(interp.evaluate(&path("\\OSI1"), Vec::new()).unwrap()), 0);
    assert_ne!(int(interp.evaluate(&path("\\OSI2"), Vec::new()).unwrap()), 0);
}

#[test]
fn alias_resolves_to_target() {
    // Name(ORIG, 9)  Alias(ORIG, ALS0)
    let aml = cat(&[&name(b"ORIG", &byte(9)), &[0x06], b"ORIG", b"ALS0"]);
    let interp = load(&aml);
    assert_eq!(int(interp.evaluate(&path("\\ALS0"), Vec::new()).unwrap()), 9);
}

#[test]
fn duplicate_names_fail_the_load() {
    let interp = hadron_aml::Interpreter::new(FakeHandler::new(), InterpreterConfig::default());
    let aml = cat(&[&name(b"DUP0", ONE), &name(b"DUP0", ZERO)]);
    let err = interp.load_table(&aml).unwrap_err();
    assert!(matches!(err, AmlError::ObjectAlreadyExists(_)), "{err:?}");
    assert!(interp.namespace().contains(&path("\\DUP0")));
}

#[test]
fn walk_enumerates_devices() {
    let aml = scope(
        b"_SB_",
        &cat(&[
            &device(b"PCI0", &device(b"LPC0", &[])),
            &device(b"PWRB", &[]),
        ]),
    );
    let interp = load(&aml);
    let mut devices = Vec::new();
    interp.namespace().walk(&path("\\"), |p, object| {
        if matches!(object, Object::Device) {
            devices.push(p.to_string());
        }
        WalkAction::Descend
    });
    assert_eq!(devices, ["\\_SB.PCI0", "\\_SB.PCI0.LPC0", "\\_SB.PWRB"]);
}

#[test]
fn rejected_string_write_leaves_string_intact() {
    // Name(STR0, "AB")
    // Method(BAD0) { Store (0x80, Index (STR0, 0)) }
    // Method(MID0) { Return (Mid (STR0, 1, 1)) }
    let aml = cat(&[
        &name(b"STR0", &string("AB")),
        &method(
            b"BAD0",
            0,
            &store(&byte(0x80), &cat(&[&[0x88], b"STR0", ZERO, NULL_TARGET])),
        ),
        &method(b"MID0", 0, &ret(&cat(&[&[0x9E], b"STR0", ONE, ONE, NULL_TARGET]))),
    ]);
    let interp = load(&aml);

    let err = interp.evaluate(&path("\\BAD0"), Vec::new()).unwrap_err();
    assert_eq!(err, AmlError::InvalidString);
    let value = interp.evaluate(&path("\\STR0"), Vec::new()).unwrap();
    assert_eq!(value.as_string().unwrap(), "AB");

    let value = interp.evaluate(&path("\\MID0"), Vec::new()).unwrap();
    assert_eq!(value.as_string().unwrap(), "B");
}

#[test]
fn object_type_looks_through_references_and_aliases() {
    // Name(INT0, 0)  Name(TGT_, 5)  Name(STR0, "X")  Alias(STR0, ALS0)
    // Method(TYP0) { Store (RefOf (TGT_), INT0)  Return (ObjectType (INT0)) }
    // Method(TYP1) { Store (RefOf (STR0), Local0)  Return (ObjectType (Local0)) }
    // Method(TYP2) { Return (ObjectType (ALS0)) }
    let object_type = |target: &[u8]| ret(&cat(&[&[0x8E], target]));
    let aml = cat(&[
        &name(b"INT0", ZERO),
        &name(b"TGT_", &byte(5)),
        &name(b"STR0", &string("X")),
        &[0x06],
        b"STR0",
        b"ALS0",
        &method(
            b"TYP0",
            0,
            &cat(&[&store(&cat(&[&[0x71], b"TGT_"]), b"INT0"), &object_type(b"INT0")]),
        ),
        &method(
            b"TYP1",
            0,
            &cat(&[&store(&cat(&[&[0x71], b"STR0"]), LOCAL0), &object_type(LOCAL0)]),
        ),
        &method(b"TYP2", 0, &object_type(b"ALS0")),
    ]);
    let interp = load(&aml);
    let eval = |m: &str| int(interp.evaluate(&path(m), Vec::new()).unwrap());

    assert_eq!(eval("\\TYP0"), 1);
    assert_eq!(eval("\\TYP1"), 2);
    assert_eq!(eval("\\TYP2"), 2);
}

#[test]
fn create_field_rejects_overflowing_byte_index() {
    // Name(BUF0, Buffer() { 0, 0 })
    // Method(MK00) { CreateByteField (BUF0, Ones, BF00) }
    let aml = cat(&[
        &name(b"BUF0", &buffer(&[0, 0])),
        &method(b"MK00", 0, &cat(&[&[0x8C], b"BUF0", ONES, b"BF00"])),
    ]);
    let interp = load(&aml);
    let err = interp.evaluate(&path("\\MK00"), Vec::new()).unwrap_err();
    assert!(
        matches!(err, AmlError::IndexOutOfBounds { index: u64::MAX, .. }),
        "{err:?}"
    );
}
