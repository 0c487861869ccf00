//! Field units over memory, port I/O, index/data pairs and PCI config space.

mod common;

use common::*;
use hadron_aml::object::RegionSpace;
use hadron_aml::{AmlError, Object, PciAddress};

const BYTE_ACC: u8 = 0x01;
const WORD_ACC: u8 = 0x02;
const DWORD_ACC: u8 = 0x03;
const LOCK: u8 = 0x10;

fn int(value: Object) -> u64 {
    match value {
        Object::Integer(v) => v,
        other => panic!("expected an integer, got {other:?}"),
    }
}

#[test]
fn memory_field_preserves_neighbouring_bits() {
    // OperationRegion(MEM0, SystemMemory, 0x100, 0x10)
    // Field(MEM0, WordAcc, Lock, Preserve) { F0__, 4, F1__, 12 }
    // Method(SET0) { Store (0xABC, F1__) }
    let aml = cat(&[
        &op_region(b"MEM0", 0x00, &word(0x100), &byte(0x10)),
        &field(b"MEM0", WORD_ACC | LOCK, &[(b"F0__", 4), (b"F1__", 12)]),
        &method(b"SET0", 0, &store(&word(0xABC), b"F1__")),
    ]);
    let interp = load(&aml);
    interp.handler().memory.lock().unwrap()[0x100] = 0x05;

    interp.evaluate(&path("\\SET0"), Vec::new()).unwrap();
    {
        let memory = interp.handler().memory.lock().unwrap();
        assert_eq!(&memory[0x100..0x102], &[0xC5, 0xAB]);
    }
    assert_eq!(int(interp.evaluate(&path("\\F1__"), Vec::new()).unwrap()), 0xABC);
    assert_eq!(int(interp.evaluate(&path("\\F0__"), Vec::new()).unwrap()), 0x5);
}

#[test]
fn wide_field_reads_as_buffer() {
    // Field(MEM0, ByteAcc) { Offset(0), BIG_, 96 } spelled as a 96-bit unit.
    let aml = cat(&[
        &op_region(b"MEM0", 0x00, ZERO, &byte(0x20)),
        &pkg(
            &[0x5B, 0x81],
            &cat(&[b"MEM0", &[BYTE_ACC], b"BIG_", &[0x40, 0x06]]),
        ),
    ]);
    let interp = load(&aml);
    {
        let mut memory = interp.handler().memory.lock().unwrap();
        for (i, byte) in memory[..12].iter_mut().enumerate() {
            *byte = i as u8 + 1;
        }
    }
    let value = interp.evaluate(&path("\\BIG_"), Vec::new()).unwrap();
    assert_eq!(value.as_buffer().unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
}

#[test]
fn access_past_region_end_fails() {
    // OperationRegion(MEM0, SystemMemory, 0, 1)  Field(MEM0, WordAcc) { F0__, 16 }
    let aml = cat(&[
        &op_region(b"MEM0", 0x00, ZERO, ONE),
        &field(b"MEM0", WORD_ACC, &[(b"F0__", 16)]),
    ]);
    let interp = load(&aml);
    let err = interp.evaluate(&path("\\F0__"), Vec::new()).unwrap_err();
    assert_eq!(err, AmlError::RegionOutOfBounds);
}

#[test]
fn unsupported_space_is_reported() {
    // OperationRegion(EC0_, EmbeddedControl, 0, 0x10)  Field(EC0_, ByteAcc) { TMP0, 8 }
    let aml = cat(&[
        &op_region(b"EC0_", 0x03, ZERO, &byte(0x10)),
        &field(b"EC0_", BYTE_ACC, &[(b"TMP0", 8)]),
    ]);
    let interp = load(&aml);
    let err = interp.evaluate(&path("\\TMP0"), Vec::new()).unwrap_err();
    assert_eq!(err, AmlError::UnsupportedRegionSpace(RegionSpace::EmbeddedControl));
}

fn cmos_table() -> Vec<u8> {
    // OperationRegion(CMS0, SystemIO, 0x70, 2)
    // Field(CMS0, ByteAcc) { IDX_, 8, DAT_, 8 }
    // IndexField(IDX_, DAT_, ByteAcc) { REG0, 8, REG1, 8 }
    cat(&[
        &op_region(b"CMS0", 0x01, &byte(0x70), &byte(2)),
        &field(b"CMS0", BYTE_ACC, &[(b"IDX_", 8), (b"DAT_", 8)]),
        &index_field(b"IDX_", b"DAT_", BYTE_ACC, &[(b"REG0", 8), (b"REG1", 8)]),
        &method(b"SET1", 1, &store(ARG0, b"REG1")),
    ])
}

#[test]
fn index_field_selects_then_reads() {
    let interp = load(&cmos_table());
    interp.handler().ports.lock().unwrap().insert(0x71, 0x5A);

    let value = interp.evaluate(&path("\\REG1"), Vec::new()).unwrap();
    assert_eq!(int(value), 0x5A);
    assert_eq!(
        interp.handler().accesses(),
        [
            Access::IoWrite { port: 0x70, width: 1, value: 1 },
            Access::IoRead { port: 0x71, width: 1 },
        ]
    );
}

#[test]
fn index_field_selects_then_writes() {
    let interp = load(&cmos_table());
    interp
        .evaluate(&path("\\SET1"), vec![Object::Integer(0x42)])
        .unwrap();
    assert_eq!(
        interp.handler().accesses(),
        [
            Access::IoWrite { port: 0x70, width: 1, value: 1 },
            Access::IoWrite { port: 0x71, width: 1, value: 0x42 },
        ]
    );
}

#[test]
fn pci_region_address_comes_from_enclosing_device() {
    // Device(PCI0) {
    //     Name(_BBN, 2)
    //     Device(DEV1) {
    //         Name(_ADR, 0x00030001)
    //         OperationRegion(CFG0, PCI_Config, 0, 0x100)
    //         Field(CFG0, DWordAcc) { VID_, 16, DID_, 16 }
    //     }
    // }
    let aml = device(
        b"PCI0",
        &cat(&[
            &name(b"_BBN", &byte(2)),
            &device(
                b"DEV1",
                &cat(&[
                    &name(b"_ADR", &dword(0x0003_0001)),
                    &op_region(b"CFG0", 0x02, ZERO, &word(0x100)),
                    &field(b"CFG0", DWORD_ACC, &[(b"VID_", 16), (b"DID_", 16)]),
                ]),
            ),
        ]),
    );
    let interp = load(&aml);
    interp
        .handler()
        .pci_config
        .lock()
        .unwrap()
        .insert(0, 0x1234_8086);

    let vid = interp.evaluate(&path("\\PCI0.DEV1.VID_"), Vec::new()).unwrap();
    let did = interp.evaluate(&path("\\PCI0.DEV1.DID_"), Vec::new()).unwrap();
    assert_eq!(int(vid), 0x8086);
    assert_eq!(int(did), 0x1234);

    let expected = PciAddress {
        segment: 0,
        bus: 2,
        device: 3,
        function: 1,
    };
    assert_eq!(
        interp.handler().accesses()[0],
        Access::PciRead {
            address: expected,
            offset: 0,
            width: 4
        }
    );
}

#[test]
fn buffer_field_writes_into_named_buffer() {
    // Name(BUF_, Buffer() { 0, 0, 0, 0 })
    // CreateWordField(BUF_, 1, WRD0)
    // Method(SET0) { Store (0xBEEF, WRD0) }
    let aml = cat(&[
        &name(b"BUF_", &buffer(&[0, 0, 0, 0])),
        &[0x8B],
        b"BUF_",
        ONE,
        b"WRD0",
        &method(b"SET0", 0, &store(&word(0xBEEF), b"WRD0")),
    ]);
    let interp = load(&aml);
    interp.evaluate(&path("\\SET0"), Vec::new()).unwrap();

    let value = interp.evaluate(&path("\\BUF_"), Vec::new()).unwrap();
    assert_eq!(value.as_buffer().unwrap(), &[0, 0xEF, 0xBE, 0]);
    assert_eq!(int(interp.evaluate(&path("\\WRD0"), Vec::new()).unwrap()), 0xBEEF);
}
