use super::{ClassHeader, ClassVisitor, Error, FieldUnit, MethodEditor};
use std::io;

/// Visitor printing a Java-like outline of a class
///
/// ```text
/// me.alec.Sample extends java.lang.Object implements java.lang.Runnable {
///    I count
///    void run();
///    Ljava/lang/String; describe(I);
/// }
/// ```
///
/// Only class names in the header are made Java-readable. Field types and non-void return types
/// stay raw descriptors (`I`, `Ljava/lang/String;`), as do parameter lists.
///
/// Nothing is modified, and the only errors are those of the underlying writer.
pub struct ClassPrinter<W: io::Write> {
    out: W,
}

impl<W: io::Write> ClassPrinter<W> {
    pub fn new(out: W) -> ClassPrinter<W> {
        ClassPrinter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> ClassVisitor for ClassPrinter<W> {
    fn visit_header(&mut self, header: &ClassHeader<'_>) -> Result<(), Error> {
        let mut line = header.name.to_owned();
        if let Some(super_name) = header.super_name {
            line.push_str(" extends ");
            line.push_str(super_name);
        }
        if !header.interfaces.is_empty() {
            line.push_str(" implements ");
            line.push_str(&header.interfaces.join(", "));
        }
        line.push_str(" {");
        writeln!(self.out, "{}", line.replace('/', "."))?;
        Ok(())
    }

    fn visit_field(&mut self, field: &FieldUnit) -> Result<(), Error> {
        writeln!(self.out, "   {} {}", field.descriptor, field.name)?;
        Ok(())
    }

    fn visit_method_start(&mut self, method: &mut MethodEditor<'_>) -> Result<(), Error> {
        let method = method.method();
        let (parameters, return_type) = match method.descriptor.find(')') {
            Some(end) => method.descriptor.split_at(end + 1),
            None => (method.descriptor.as_str(), ""),
        };
        let return_type = if return_type == "V" { "void" } else { return_type };
        writeln!(self.out, "   {} {}{};", return_type, method.name, parameters)?;
        Ok(())
    }

    fn visit_end(&mut self) -> Result<(), Error> {
        writeln!(self.out, "}}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::{
        traverse, ClassAccessFlags, ClassUnit, FieldAccessFlags, MethodAccessFlags, MethodUnit,
        ROOT_CLASS_NAME,
    };

    fn print(class: &mut ClassUnit) -> String {
        let mut printer = ClassPrinter::new(vec![]);
        traverse(class, &mut printer).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn outline() {
        let mut class = ClassUnit::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            "me/alec/Sample",
            Some(ROOT_CLASS_NAME),
        );
        class.interfaces.push(String::from("java/lang/Runnable"));
        class.interfaces.push(String::from("java/io/Serializable"));
        class.fields.push(FieldUnit::new(FieldAccessFlags::PRIVATE, "a", "I"));
        class.fields.push(FieldUnit::new(FieldAccessFlags::PRIVATE, "b", "[Ljava/lang/String;"));
        class.methods.push(MethodUnit::new(MethodAccessFlags::PUBLIC, "run", "()V"));
        class.methods.push(MethodUnit::new(
            MethodAccessFlags::PUBLIC,
            "describe",
            "(IJ)Ljava/lang/String;",
        ));

        assert_eq!(
            print(&mut class),
            "me.alec.Sample extends java.lang.Object implements java.lang.Runnable, java.io.Serializable {\n\
             \x20  I a\n\
             \x20  [Ljava/lang/String; b\n\
             \x20  void run();\n\
             \x20  Ljava/lang/String; describe(IJ);\n\
             }\n"
        );
    }

    #[test]
    fn root_class_has_no_superclass() {
        let mut class = ClassUnit::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC,
            ROOT_CLASS_NAME,
            None,
        );
        assert_eq!(print(&mut class), "java.lang.Object {\n}\n");
    }
}
