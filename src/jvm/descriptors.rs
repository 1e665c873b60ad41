use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => {
                let msg = format!("Unexpected leftover input '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            None => {
                let msg = "Missing base type character";
                return Err(Error::new(ErrorKind::UnexpectedEof, msg));
            }
        };
        Ok(typ)
    }
}

/// Type of a field, parameter, return value, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),

    /// Internal name of a class (eg. `java/lang/String`)
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Number of stack or local variable slots a value of this type takes
    pub fn slot_width(&self) -> u16 {
        match self {
            FieldType::Base(BaseType::Long | BaseType::Double) => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Object(class_name) => {
                write_to.push('L');
                write_to.push_str(class_name);
                write_to.push(';');
            }
            FieldType::Array(element_type) => {
                write_to.push('[');
                element_type.render_to(write_to);
            }
        }
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek().copied() {
            None => Err(Error::new(ErrorKind::UnexpectedEof, "Missing field type")),
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                BaseType::parse_from(source).map(FieldType::Base)
            }
            Some('L') => {
                source.next();
                let mut class_name = String::new();
                loop {
                    match source.next() {
                        Some(';') if !class_name.is_empty() => {
                            return Ok(FieldType::Object(class_name))
                        }
                        Some(';') => {
                            let msg = "Empty class name in object type";
                            return Err(Error::new(ErrorKind::InvalidInput, msg));
                        }
                        Some(c) => class_name.push(c),
                        None => {
                            let msg = format!("Missing terminator for 'L{}'", class_name);
                            return Err(Error::new(ErrorKind::UnexpectedEof, msg));
                        }
                    }
                }
            }
            Some('[') => {
                source.next();
                let element_type = FieldType::parse_from(source)?;
                Ok(FieldType::Array(Box::new(element_type)))
            }
            Some(c) => {
                let msg = format!("Invalid field type character '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl MethodDescriptor {
    /// Total length of parameters (not the same as the length of the vector),
    /// which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        self.parameters
            .iter()
            .map(|parameter| parameter.slot_width() as usize)
            .sum::<usize>()
            + this_len
    }

    /// Number of stack slots taken by the return value
    pub fn return_width(&self) -> u16 {
        self.return_type.as_ref().map_or(0, FieldType::slot_width)
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        if source.next() != Some('(') {
            let msg = "Expected '(' for method";
            return Err(Error::new(ErrorKind::InvalidInput, msg));
        }

        let mut parameters = vec![];
        while source.peek().copied() != Some(')') {
            parameters.push(FieldType::parse_from(source)?);
        }
        source.next();

        let return_type = if let Some('V') = source.peek().copied() {
            source.next();
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip<D: ParseDescriptor + RenderDescriptor>(descriptor: &str) {
        let parsed = D::parse(descriptor).unwrap();
        assert_eq!(parsed.render(), descriptor);
    }

    #[test]
    fn field_types() {
        round_trip::<FieldType>("I");
        round_trip::<FieldType>("Ljava/lang/String;");
        round_trip::<FieldType>("[[J");
        round_trip::<FieldType>("[Ljava/io/PrintStream;");
        assert_eq!(
            FieldType::parse("[Ljava/lang/Object;").unwrap(),
            FieldType::Array(Box::new(FieldType::Object(String::from("java/lang/Object"))))
        );
        assert_eq!(FieldType::parse("D").unwrap().slot_width(), 2);
        assert_eq!(FieldType::parse("[D").unwrap().slot_width(), 1);
    }

    #[test]
    fn method_descriptors() {
        round_trip::<MethodDescriptor>("()V");
        round_trip::<MethodDescriptor>("(Ljava/lang/String;)V");
        round_trip::<MethodDescriptor>("(IJ[Ljava/lang/Object;D)Ljava/lang/String;");

        let descriptor = MethodDescriptor::parse("(IJLjava/lang/Object;D)J").unwrap();
        assert_eq!(descriptor.parameter_length(false), 6);
        assert_eq!(descriptor.parameter_length(true), 7);
        assert_eq!(descriptor.return_width(), 2);
        assert_eq!(MethodDescriptor::parse("()V").unwrap().return_width(), 0);
    }

    #[test]
    fn invalid_descriptors() {
        assert!(FieldType::parse("").is_err());
        assert!(FieldType::parse("V").is_err());
        assert!(FieldType::parse("Ljava/lang/String").is_err());
        assert!(FieldType::parse("L;").is_err());
        assert!(FieldType::parse("II").is_err());
        assert!(MethodDescriptor::parse("V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(I)").is_err());
    }
}
