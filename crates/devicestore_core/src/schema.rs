//! Tables, column qualifiers and record-type discriminators.
//!
//! ```text
//! uids          [kind][namespace][token | value]         token directory
//! area_types    [type:4][0x00]                           area types
//! areas         [area:4][0x00]                           areas
//!               [area:4][0x01][zone:4]                   zones
//!               [area:4][0x02][assignment:4]             assignments
//! devices       [device:4][0x00]                         devices
//! device_types  [type:4][0x00]                           device types
//!               [type:4][0x01][command:4]                commands
//!               [type:4][0x02][status:4]                 statuses
//! groups        [group:4][0x00]                          groups
//!               [group:4][0x01][element:4]               group elements
//! streams       [area:4][0x02][assignment:4][0x01][id..] streams
//! ```

/// The tables the core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Token directory.
    Uids,
    /// Area types.
    AreaTypes,
    /// Areas with their zones and assignments.
    Areas,
    /// Devices.
    Devices,
    /// Device types with their commands and statuses.
    DeviceTypes,
    /// Device groups with their elements.
    Groups,
    /// Device streams, keyed under their assignment.
    Streams,
}

impl Table {
    /// Every table, in creation order.
    pub const ALL: [Table; 7] = [
        Table::Uids,
        Table::AreaTypes,
        Table::Areas,
        Table::Devices,
        Table::DeviceTypes,
        Table::Groups,
        Table::Streams,
    ];

    /// Unprefixed table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Table::Uids => "uids",
            Table::AreaTypes => "area_types",
            Table::Areas => "areas",
            Table::Devices => "devices",
            Table::DeviceTypes => "device_types",
            Table::Groups => "groups",
            Table::Streams => "streams",
        }
    }
}

/// Column qualifiers.
pub mod columns {
    /// Encoded entity body.
    pub const PAYLOAD: &[u8] = b"p";
    /// Payload type indicator.
    pub const PAYLOAD_TYPE: &[u8] = b"t";
    /// Soft-delete marker.
    pub const DELETED: &[u8] = b"d";
    /// Zone counter on an area row.
    pub const ZONE_COUNTER: &[u8] = b"zc";
    /// Assignment counter on an area row.
    pub const ASSIGNMENT_COUNTER: &[u8] = b"ac";
    /// Command counter on a device type row.
    pub const COMMAND_COUNTER: &[u8] = b"cc";
    /// Status counter on a device type row.
    pub const STATUS_COUNTER: &[u8] = b"sc";
    /// Element counter on a group row.
    pub const ELEMENT_COUNTER: &[u8] = b"ec";
    /// Assignment status code.
    pub const ASSIGNMENT_STATUS: &[u8] = b"as";
    /// Assignment state type indicator.
    pub const ASSIGNMENT_STATE_TYPE: &[u8] = b"at";
    /// Assignment state body.
    pub const ASSIGNMENT_STATE: &[u8] = b"ad";
    /// Active assignment token on a device row.
    pub const CURRENT_ASSIGNMENT: &[u8] = b"ca";
    /// Prefix of assignment history columns on a device row.
    pub const ASSIGNMENT_HISTORY: &[u8] = b"h";
    /// Directory value.
    pub const VALUE: &[u8] = b"v";
    /// Directory counter.
    pub const COUNTER: &[u8] = b"c";
}

/// Value stored in the [`columns::DELETED`] column.
pub const DELETED_MARKER: u8 = 0x01;

/// A record-type discriminator for one table.
///
/// Each table's discriminators sort below its `END` value, which is
/// reserved for computing exclusive scan stop keys.
pub trait RecordType: Copy {
    /// The end-of-range discriminator.
    const END: Self;

    /// The discriminator byte.
    fn discriminator(self) -> u8;
}

macro_rules! record_type {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl RecordType for $name {
            const END: Self = $name::End;

            fn discriminator(self) -> u8 {
                self as u8
            }
        }
    };
}

record_type!(
    /// Records in the `area_types` table.
    AreaTypeRecord {
        /// Area type primary record.
        AreaType = 0x00,
        /// End marker.
        End = 0x01,
    }
);

record_type!(
    /// Records in the `areas` table.
    AreaRecord {
        /// Area primary record.
        Area = 0x00,
        /// Zone under an area.
        Zone = 0x01,
        /// Assignment under an area.
        Assignment = 0x02,
        /// End marker.
        End = 0x03,
    }
);

record_type!(
    /// Records in the `devices` table.
    DeviceRecord {
        /// Device primary record.
        Device = 0x00,
        /// End marker.
        End = 0x01,
    }
);

record_type!(
    /// Records in the `device_types` table.
    DeviceTypeRecord {
        /// Device type primary record.
        DeviceType = 0x00,
        /// Command under a device type.
        Command = 0x01,
        /// Status under a device type.
        Status = 0x02,
        /// End marker.
        End = 0x03,
    }
);

record_type!(
    /// Records in the `groups` table.
    GroupRecord {
        /// Group primary record.
        Group = 0x00,
        /// Element under a group.
        Element = 0x01,
        /// End marker.
        End = 0x02,
    }
);

record_type!(
    /// Records in the `streams` table, below an assignment key.
    AssignmentRecord {
        /// Stream under an assignment.
        Stream = 0x01,
        /// End marker.
        End = 0x02,
    }
);
