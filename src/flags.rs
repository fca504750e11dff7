use bitflags::bitflags;

bitflags! {
    /// Flags accepted by [`FileSystem::open_file`](crate::FileSystem::open_file).
    ///
    /// Exactly one of `RDONLY`, `WRONLY` or `RDWR` selects the access mode (`RDONLY` is the
    /// empty value); the rest may be combined freely. Bit values follow Linux.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const RDONLY = 0o0;
        const WRONLY = 0o1;
        const RDWR = 0o2;
        const CREAT = 0o100;
        const EXCL = 0o200;
        const TRUNC = 0o1000;
        const APPEND = 0o2000;
    }
}

const ACCESS_MODE: u32 = 0o3;

impl OpenFlags {
    /// `true` unless the access mode is write-only.
    pub fn is_readable(&self) -> bool {
        self.bits() & ACCESS_MODE != Self::WRONLY.bits()
    }

    /// `true` for write-only and read-write access modes.
    pub fn is_writable(&self) -> bool {
        let mode = self.bits() & ACCESS_MODE;
        mode == Self::WRONLY.bits() || mode == Self::RDWR.bits()
    }

    pub fn is_create(&self) -> bool {
        self.contains(Self::CREAT)
    }

    pub fn is_exclusive(&self) -> bool {
        self.contains(Self::CREAT | Self::EXCL)
    }

    pub fn is_truncate(&self) -> bool {
        self.contains(Self::TRUNC)
    }

    pub fn is_append(&self) -> bool {
        self.contains(Self::APPEND)
    }

    /// Translates the flags into host `OpenOptions`.
    pub(crate) fn to_open_options(self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.is_readable())
            .write(self.is_writable() && !self.is_append())
            .append(self.is_append() && self.is_writable());
        if self.is_exclusive() {
            options.create_new(true);
        } else {
            options.create(self.is_create());
        }
        // std rejects truncate without write access
        if self.is_writable() {
            options.truncate(self.is_truncate());
        }
        options
    }
}
