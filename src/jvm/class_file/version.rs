use super::{ByteReader, Deserialize, Serialize};
use crate::jvm::Error;
use byteorder::WriteBytesExt;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// JDK 1.1, the oldest version with a stable format
    pub const JAVA1_1: Version = Version::release(45);

    /// Java SE 8 (March 2014), first version which requires `StackMapTable` for all code
    pub const JAVA8: Version = Version::release(52);

    pub const JAVA11: Version = Version::release(55);

    pub const JAVA17: Version = Version::release(61);

    /// Java SE 21 (September 2023), the newest version accepted
    pub const JAVA21: Version = Version::release(65);

    const fn release(major_version: u16) -> Version {
        Version {
            major_version,
            minor_version: 0,
        }
    }

    /// Does this crate know how to read classes of this version?
    ///
    /// Minor versions are not checked: before Java 12 they were unused, and after they only mark
    /// preview features.
    pub fn is_supported(&self) -> bool {
        Version::JAVA1_1.major_version <= self.major_version
            && self.major_version <= Version::JAVA21.major_version
    }
}

/// Minor version is first in the class file
impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Version {
    fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, Error> {
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        Ok(Version {
            major_version,
            minor_version,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn supported_range() {
        assert!(Version::JAVA1_1.is_supported());
        assert!(Version::JAVA8.is_supported());
        assert!(Version::JAVA21.is_supported());
        assert!(!Version::release(44).is_supported());
        assert!(!Version::release(66).is_supported());
        assert!(Version::JAVA8 < Version::JAVA17);
    }
}
