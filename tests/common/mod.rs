//! Hand assembly of class files, byte by byte
#![allow(dead_code)]

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_INTERFACE: u16 = 0x0200;

/// Builds a class file with no constant deduplication and no class attributes
pub struct ClassAssembler {
    major_version: u16,
    pool: Vec<u8>,
    next_index: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
}

impl ClassAssembler {
    pub fn new() -> ClassAssembler {
        ClassAssembler::with_version(52)
    }

    pub fn with_version(major_version: u16) -> ClassAssembler {
        ClassAssembler {
            major_version,
            pool: vec![],
            next_index: 1,
            fields: vec![],
            methods: vec![],
        }
    }

    /// Number of bytes taken by the constant pool entries so far
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    fn entry(&mut self, bytes: &[u8]) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += if bytes[0] == 5 || bytes[0] == 6 { 2 } else { 1 };
        index
    }

    pub fn utf8(&mut self, string: &str) -> u16 {
        let mut bytes = vec![1];
        bytes.extend_from_slice(&(string.len() as u16).to_be_bytes());
        bytes.extend_from_slice(string.as_bytes());
        self.entry(&bytes)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.entry(&[7, (name >> 8) as u8, name as u8])
    }

    pub fn string(&mut self, string: &str) -> u16 {
        let utf8 = self.utf8(string);
        self.entry(&[8, (utf8 >> 8) as u8, utf8 as u8])
    }

    pub fn integer(&mut self, integer: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&integer.to_be_bytes());
        self.entry(&bytes)
    }

    pub fn long(&mut self, long: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&long.to_be_bytes());
        self.entry(&bytes)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.entry(&[
            12,
            (name >> 8) as u8,
            name as u8,
            (descriptor >> 8) as u8,
            descriptor as u8,
        ])
    }

    fn member_ref(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        self.entry(&[
            tag,
            (class >> 8) as u8,
            class as u8,
            (name_and_type >> 8) as u8,
            name_and_type as u8,
        ])
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, owner, name, descriptor)
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = vec![];
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&name.to_be_bytes());
        bytes.extend_from_slice(&descriptor.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        self.fields.push(bytes);
    }

    /// Method with a `Code` attribute (no exception table, no code attributes)
    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) {
        let code_name = self.utf8("Code");
        let mut body = vec![];
        body.extend_from_slice(&max_stack.to_be_bytes());
        body.extend_from_slice(&max_locals.to_be_bytes());
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(code);
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());

        let mut attribute = vec![];
        attribute.extend_from_slice(&code_name.to_be_bytes());
        attribute.extend_from_slice(&(body.len() as u32).to_be_bytes());
        attribute.extend_from_slice(&body);
        self.raw_method(access_flags, name, descriptor, &[attribute]);
    }

    /// Method with no attributes (abstract or native)
    pub fn abstract_method(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        self.raw_method(access_flags, name, descriptor, &[]);
    }

    fn raw_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Vec<u8>],
    ) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = vec![];
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&name.to_be_bytes());
        bytes.extend_from_slice(&descriptor.to_be_bytes());
        bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attribute in attributes {
            bytes.extend_from_slice(attribute);
        }
        self.methods.push(bytes);
    }

    /// Lay out the class file, using constant indices for the class and superclass
    pub fn finish(&self, access_flags: u16, this_class: u16, super_class: u16) -> Vec<u8> {
        let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00];
        bytes.extend_from_slice(&self.major_version.to_be_bytes());
        bytes.extend_from_slice(&self.next_index.to_be_bytes());
        bytes.extend_from_slice(&self.pool);
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&this_class.to_be_bytes());
        bytes.extend_from_slice(&super_class.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        bytes.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for field in &self.fields {
            bytes.extend_from_slice(field);
        }
        bytes.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            bytes.extend_from_slice(method);
        }
        bytes.extend_from_slice(&0u16.to_be_bytes()); // attributes
        bytes
    }
}

/// `Sample extends java/lang/Object`, with a constructor and the extra methods added by `build`
pub fn sample_class(build: impl FnOnce(&mut ClassAssembler)) -> Vec<u8> {
    let mut asm = ClassAssembler::new();
    let this_class = asm.class("Sample");
    let super_class = asm.class("java/lang/Object");

    // aload_0; invokespecial java/lang/Object.<init>()V; return
    let init = asm.method_ref("java/lang/Object", "<init>", "()V");
    let [hi, lo] = init.to_be_bytes();
    asm.method(ACC_PUBLIC, "<init>", "()V", 1, 1, &[0x2a, 0xb7, hi, lo, 0xb1]);

    build(&mut asm);
    asm.finish(ACC_PUBLIC | ACC_SUPER, this_class, super_class)
}

/// Position of a byte sequence in a class file
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("byte sequence not found")
}
