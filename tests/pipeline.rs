mod common;

use classtrace::agent::{ClassFileTransformer, EntryLogTransformer};
use classtrace::instrument::{transform_class, Settings};
use classtrace::jvm::class_file::{BootstrapTable, ConstantsPool, Version};
use classtrace::jvm::code::{opcodes, Code, Instruction, JumpKind, LoadableConstant};
use classtrace::jvm::*;
use common::*;
use std::thread;

fn entry_prologue(message: &str) -> Vec<Instruction> {
    vec![
        Instruction::get_static("java/lang/System", "out", "Ljava/io/PrintStream;"),
        Instruction::ldc_string(message),
        Instruction::invoke_virtual("java/io/PrintStream", "println", "(Ljava/lang/String;)V"),
    ]
}

fn code_bytes(code: &Code) -> Vec<u8> {
    let mut constants = ConstantsPool::new();
    let mut bootstrap_methods = BootstrapTable::default();
    code.serialize_code(&mut constants, &mut bootstrap_methods)
        .unwrap()
        .code_array
        .0
}

/// `int abs(int x) { return x >= 0 ? x : -x; }`, without a stack map
fn add_abs(asm: &mut ClassAssembler) {
    let code = [
        0x1a, // iload_0
        0x9c, 0x00, 0x05, // ifge +5
        0x1a, // iload_0
        0x74, // ineg
        0xac, // ireturn
    ];
    asm.method(ACC_PUBLIC | ACC_STATIC, "abs", "(I)I", 1, 1, &code);
}

/// `switch (0) { default: return; }` as a `tableswitch`
fn add_pick(asm: &mut ClassAssembler) {
    let code = [
        0x03, // iconst_0
        0xaa, 0x00, 0x00, // tableswitch + padding
        0x00, 0x00, 0x00, 0x13, // default
        0x00, 0x00, 0x00, 0x00, // low
        0x00, 0x00, 0x00, 0x00, // high
        0x00, 0x00, 0x00, 0x13, // 0
        0xb1, // return
    ];
    asm.method(ACC_PUBLIC | ACC_STATIC, "pick", "()V", 1, 0, &code);
}

fn add_constants(asm: &mut ClassAssembler) {
    let string = asm.string("hello") as u8;
    let [hi, lo] = asm.long(1 << 40).to_be_bytes();
    let code = [
        0x12, string, // ldc "hello"
        0x57, // pop
        0x14, hi, lo, // ldc2_w 1099511627776L
        0xad, // lreturn
    ];
    asm.method(ACC_PUBLIC | ACC_STATIC, "constants", "()J", 2, 0, &code);
}

#[test]
fn sample_run_gets_a_prologue() {
    let bytes = sample_class(|asm| asm.method(ACC_PUBLIC, "run", "()V", 0, 1, &[]));

    let reader = ClassReader::new(&bytes).unwrap();
    assert_eq!(reader.class_name(), "Sample");
    assert_eq!(reader.super_name(), Some("java/lang/Object"));
    assert_eq!(reader.version(), Version::JAVA8);

    let original = reader.read().unwrap();
    let run = original.methods[1].code.as_ref().unwrap();
    assert!(run.instructions.is_empty());
    assert_eq!(run.max_stack, 0);

    let transformed = transform_class(&bytes, &Settings::new(["Sample"])).unwrap();
    let class = decode(&transformed).unwrap();
    assert_eq!(class.name, "Sample");
    assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));

    let run = class.methods[1].code.as_ref().unwrap();
    assert_eq!(run.instructions, entry_prologue("Enter method-> Sample.run"));
    assert_eq!(run.max_stack, 3);

    // `getstatic`, `ldc`, `invokevirtual`
    let encoded = code_bytes(run);
    assert_eq!(encoded.len(), 8);
    assert_eq!(encoded[0], 0xb2);
    assert_eq!(encoded[3], opcodes::LDC);
    assert_eq!(encoded[5], 0xb6);

    // Constructor is untouched
    assert_eq!(class.methods[0], original.methods[0]);
}

#[test]
fn decode_encode_decode_is_stable() {
    let bytes = sample_class(|asm| {
        asm.field(ACC_PUBLIC, "count", "I");
        asm.field(ACC_PUBLIC | ACC_STATIC, "names", "[Ljava/lang/String;");
        add_abs(asm);
        add_pick(asm);
        add_constants(asm);
        asm.abstract_method(ACC_PUBLIC | ACC_ABSTRACT, "later", "()V");
    });

    let decoded = decode(&bytes).unwrap();
    let reencoded = encode(&decoded).unwrap();
    assert_eq!(decode(&reencoded).unwrap(), decoded);

    let constants = decoded.methods[3].code.as_ref().unwrap();
    assert_eq!(
        constants.instructions,
        vec![
            Instruction::ldc_string("hello"),
            Instruction::Plain(opcodes::POP),
            Instruction::Ldc(LoadableConstant::Long(1 << 40)),
            Instruction::Plain(opcodes::LRETURN),
        ]
    );
}

#[test]
fn branches_survive_the_prologue() {
    let bytes = sample_class(add_abs);
    let original = decode(&bytes).unwrap();
    let transformed = transform_class(&bytes, &Settings::new(["Sample"])).unwrap();
    let class = decode(&transformed).unwrap();

    let before = original.methods[1].code.as_ref().unwrap();
    let after = class.methods[1].code.as_ref().unwrap();
    assert_eq!(after.instructions[..3], entry_prologue("Enter method-> Sample.abs")[..]);
    assert_eq!(after.instructions[3..], before.instructions[..]);
    assert_eq!(after.max_stack, before.max_stack + 3);

    // Jump offsets are relative, so the `ifge` is encoded the same, just 8 bytes later
    let encoded = code_bytes(after);
    assert_eq!(encoded[8..], [0x1a_u8, 0x9c, 0x00, 0x05, 0x1a, 0x74, 0xac]);
}

#[test]
fn switch_padding_is_recomputed() {
    let bytes = sample_class(add_pick);
    let mut class = decode(&bytes).unwrap();
    let code = class.methods[1].code.as_mut().unwrap();

    let expected: Vec<u8> = vec![
        0x03, 0xaa, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x13, //
        0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x13, //
        0xb1,
    ];
    assert_eq!(code_bytes(code), expected);

    // One byte earlier in the method means one byte less of padding
    code.instructions.insert(0, Instruction::Plain(opcodes::NOP));
    let expected: Vec<u8> = vec![
        0x00, 0x03, 0xaa, 0x00, //
        0x00, 0x00, 0x00, 0x12, //
        0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00, 0x12, //
        0xb1,
    ];
    assert_eq!(code_bytes(code), expected);
}

#[test]
fn non_targets_pass_through() {
    let bytes = sample_class(add_abs);
    let transformed = transform_class(&bytes, &Settings::new(["Other"])).unwrap();
    assert_eq!(transformed, bytes);

    let mut class = decode(&bytes).unwrap();
    let instrumented = classtrace::instrument::instrument(&mut class, &Settings::new(["Other"]));
    assert_eq!(instrumented.unwrap(), 0);
    assert_eq!(class, decode(&bytes).unwrap());
}

#[test]
fn oversized_log_message_fails_encoding() {
    // Both names are legal, but the message naming them doesn't fit in a utf8 constant
    let class_name = "C".repeat(40_000);
    let method_name = "m".repeat(30_000);
    let mut asm = ClassAssembler::new();
    let this_class = asm.class(&class_name);
    let super_class = asm.class("java/lang/Object");
    asm.method(ACC_PUBLIC | ACC_STATIC, &method_name, "()V", 0, 0, &[0xb1]);
    let bytes = asm.finish(ACC_PUBLIC | ACC_SUPER, this_class, super_class);

    let settings = Settings::new([class_name.as_str()]);
    match transform_class(&bytes, &settings) {
        Err(Error::Encode(EncodeError::Utf8TooLong(len))) => {
            assert_eq!(len, "Enter method-> ".len() + 40_000 + 1 + 30_000)
        }
        other => panic!("expected too long string, got {:?}", other.map(|out| out.len())),
    }
}

#[test]
fn malformed_inputs_report_offsets() {
    let bytes = sample_class(add_abs);

    let mut bad_magic = bytes.clone();
    bad_magic[3] = 0xBF;
    match decode(&bad_magic) {
        Err(Error::Malformed { offset: 0, kind }) => {
            assert_eq!(kind, MalformedKind::BadMagic(0xCAFE_BABF))
        }
        other => panic!("expected bad magic, got {:?}", other),
    }

    let mut asm = ClassAssembler::with_version(66);
    let this_class = asm.class("Sample");
    let future = asm.finish(ACC_PUBLIC, this_class, 0);
    match decode(&future) {
        Err(Error::Malformed { offset: 4, kind }) => assert_eq!(
            kind,
            MalformedKind::UnsupportedVersion(Version {
                major_version: 66,
                minor_version: 0,
            })
        ),
        other => panic!("expected unsupported version, got {:?}", other),
    }

    let truncated = &bytes[..bytes.len() - 1];
    match decode(truncated) {
        Err(Error::Malformed { offset, kind }) => {
            assert_eq!(offset, bytes.len() - 2);
            assert_eq!(kind, MalformedKind::UnexpectedEof);
        }
        other => panic!("expected truncation, got {:?}", other),
    }

    let mut asm = ClassAssembler::new();
    let super_class = asm.class("java/lang/Object");
    let dangling = asm.finish(ACC_PUBLIC, 99, super_class);
    match decode(&dangling) {
        Err(Error::Malformed { offset, kind }) => {
            assert_eq!(offset, 10 + asm.pool_len() + 2);
            assert_eq!(kind, MalformedKind::InvalidConstantIndex(99));
        }
        other => panic!("expected dangling index, got {:?}", other),
    }
}

#[test]
fn subroutines_are_unsupported() {
    let jsr = [0xa8, 0x00, 0x03, 0xb1];
    let bytes = sample_class(|asm| asm.method(ACC_PUBLIC, "old", "()V", 1, 1, &jsr));

    // The header can still be read, only the body fails
    let reader = ClassReader::new(&bytes).unwrap();
    assert_eq!(reader.class_name(), "Sample");
    match reader.read() {
        Err(Error::Unsupported { offset, construct }) => {
            assert_eq!(offset, find(&bytes, &jsr));
            assert_eq!(construct, UnsupportedConstruct::Opcode(opcodes::JSR));
        }
        other => panic!("expected unsupported opcode, got {:?}", other),
    }

    // Failures propagate out of the pipeline, and the hook turns them into "no transformation"
    let settings = Settings::new(["Sample"]);
    assert!(transform_class(&bytes, &settings).is_err());
    let hook = EntryLogTransformer::new(settings);
    assert_eq!(hook.transform(None, "Sample", false, &bytes), None);
}

#[test]
fn unplaced_labels_fail_encoding() {
    let mut class = ClassUnit::new(
        Version::JAVA8,
        ClassAccessFlags::PUBLIC,
        "Sample",
        Some(ROOT_CLASS_NAME),
    );
    let mut method = MethodUnit::new(MethodAccessFlags::PUBLIC, "spin", "()V");
    let mut code = Code::new(0, 1);
    let nowhere = code.fresh_label();
    code.instructions.push(Instruction::Jump(JumpKind::Goto, nowhere));
    method.code = Some(code);
    class.methods.push(method);

    match encode(&class) {
        Err(Error::Encode(EncodeError::UnplacedLabel(label))) => assert_eq!(label, nowhere),
        other => panic!("expected unplaced label, got {:?}", other),
    }
}

#[test]
fn hook_transforms_targets() {
    let bytes = sample_class(|asm| asm.method(ACC_PUBLIC, "run", "()V", 0, 1, &[0xb1]));
    let hook = EntryLogTransformer::new(Settings::new(["Sample"]));

    let transformed = hook.transform(Some("app"), "Sample", false, &bytes).unwrap();
    let class = decode(&transformed).unwrap();
    let run = class.methods[1].code.as_ref().unwrap();
    assert_eq!(run.instructions.len(), 4);
    assert_eq!(run.max_stack, 3);

    assert_eq!(hook.transform(Some("app"), "Other", false, &bytes), None);
}

#[test]
fn concurrent_pipelines() {
    let inputs: Vec<Vec<u8>> = (0..4)
        .map(|i| {
            sample_class(|asm| {
                add_abs(asm);
                if i % 2 == 0 {
                    add_pick(asm);
                }
            })
        })
        .collect();
    let settings = Settings::new(["Sample"]);
    let sequential: Vec<Vec<u8>> = inputs
        .iter()
        .map(|input| transform_class(input, &settings).unwrap())
        .collect();

    let settings = &settings;
    let concurrent: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(move || transform_class(input, settings).unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert_eq!(concurrent, sequential);
}

#[test]
fn interface_from_scratch() {
    let mut class = ClassUnit::new(
        Version::JAVA1_1,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::ABSTRACT | ClassAccessFlags::INTERFACE,
        "Test",
        Some(ROOT_CLASS_NAME),
    );
    class.interfaces.push(String::from("java/lang/Runnable"));
    let mut version = FieldUnit::new(
        FieldAccessFlags::PUBLIC | FieldAccessFlags::FINAL | FieldAccessFlags::STATIC,
        "VERSION",
        "I",
    );
    version.constant_value = Some(LoadableConstant::Integer(1));
    class.fields.push(version);
    class.methods.push(MethodUnit::new(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
        "method",
        "()V",
    ));
    assert!(class.is_interface());

    let bytes = encode(&class).unwrap();
    let reader = ClassReader::new(&bytes).unwrap();
    let mut printer = ClassPrinter::new(vec![]);
    let mut decoded = reader.accept(&mut printer).unwrap();
    assert_eq!(
        String::from_utf8(printer.into_inner()).unwrap(),
        "Test extends java.lang.Object implements java.lang.Runnable {\n   I VERSION\n   void method();\n}\n"
    );
    assert_eq!(decoded, class);

    // Nothing to instrument in an interface with only abstract methods
    let settings = Settings::new(["Test"]);
    assert_eq!(classtrace::instrument::instrument(&mut decoded, &settings).unwrap(), 0);
}
