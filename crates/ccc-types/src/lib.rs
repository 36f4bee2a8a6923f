//! The closed set of input/intermediate/output file types recognized by the
//! driver, plus the suffix- and specifier-based lookup tables used to
//! classify an input argument.
//!
//! This is pure data: no I/O, no parsing. `ccc-opts` and `ccc-pipeline`
//! depend on it to classify inputs and derive output names.

/// One entry in the closed type table.
///
/// Mirrors the `Types.InputType`/`FileType` hierarchy of the reference
/// driver: every type carries its own preprocessed counterpart (if any),
/// whether it can only be assembled or only precompiled, and the suffix
/// used for temp-file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// C source, e.g. `foo.c`.
    C,
    /// Preprocessed C source, e.g. `foo.i`.
    CPreprocessed,
    /// C++ source, e.g. `foo.cpp`.
    Cxx,
    /// Preprocessed C++ source, e.g. `foo.ii`.
    CxxPreprocessed,
    /// Objective-C source, e.g. `foo.m`.
    ObjC,
    /// Preprocessed Objective-C source.
    ObjCPreprocessed,
    /// Objective-C++ source, e.g. `foo.mm`.
    ObjCxx,
    /// Preprocessed Objective-C++ source.
    ObjCxxPreprocessed,
    /// Assembly requiring preprocessing, e.g. `foo.S`.
    Asm,
    /// Assembly with no preprocessing step, e.g. `foo.s`.
    AsmNoPP,
    /// LLVM IR source (textual or bitcode).
    LLVMIr,
    /// Object file, e.g. `foo.o`. Also the classification used for
    /// unrecognized suffixes, `-filelist` entries, and other linker inputs.
    Object,
    /// C header source selected for precompilation, e.g. via `-x c-header`.
    CHeader,
    /// Preprocessed C header source, ready for the precompile phase.
    CHeaderPreprocessed,
    /// Precompiled header output.
    PCH,
    /// Final linked image (e.g. `a.out`), or a lipo-combined universal
    /// binary.
    Image,
    /// The "no output" sentinel type, e.g. under `-fsyntax-only`.
    Nothing,
}

impl FileType {
    /// Canonical name, as used in `-ccc-print-phases` output and the
    /// `-x`/`--print-...` specifier vocabulary.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::CPreprocessed => "cpp-output",
            Self::Cxx => "c++",
            Self::CxxPreprocessed => "c++-cpp-output",
            Self::ObjC => "objective-c",
            Self::ObjCPreprocessed => "objective-c-cpp-output",
            Self::ObjCxx => "objective-c++",
            Self::ObjCxxPreprocessed => "objective-c++-cpp-output",
            Self::Asm => "assembler-with-cpp",
            Self::AsmNoPP => "assembler",
            Self::LLVMIr => "ir",
            Self::Object => "object",
            Self::CHeader => "c-header",
            Self::CHeaderPreprocessed => "c-header-cpp-output",
            Self::PCH => "precompiled-header",
            Self::Image => "image",
            Self::Nothing => "nothing",
        }
    }

    /// The type produced by preprocessing this type, if it needs
    /// preprocessing at all. `None` means the type is already preprocessed
    /// (or preprocessing doesn't apply, e.g. object/image/nothing).
    #[must_use]
    pub const fn preprocess_target(self) -> Option<FileType> {
        match self {
            Self::C => Some(Self::CPreprocessed),
            Self::Cxx => Some(Self::CxxPreprocessed),
            Self::ObjC => Some(Self::ObjCPreprocessed),
            Self::ObjCxx => Some(Self::ObjCxxPreprocessed),
            Self::Asm => Some(Self::AsmNoPP),
            Self::CHeader => Some(Self::CHeaderPreprocessed),
            _ => None,
        }
    }

    /// Whether this type needs a preprocess phase prepended to its
    /// sequence (equivalent to the reference driver's `klass.preprocess`
    /// truthiness check).
    #[must_use]
    pub const fn needs_preprocess(self) -> bool {
        self.preprocess_target().is_some()
    }

    /// Types whose phase sequence is exactly `Assemble -> Link` (no
    /// compile step). True for both the preprocessed and unpreprocessed
    /// assembly types: after preprocessing, assembly is still only
    /// assembled, never compiled.
    #[must_use]
    pub const fn only_assemble(self) -> bool {
        matches!(self, Self::Asm | Self::AsmNoPP)
    }

    /// Types whose phase sequence is exactly `Precompile` (no further
    /// steps; precompiled headers are not linked).
    #[must_use]
    pub const fn only_precompile(self) -> bool {
        matches!(self, Self::CHeader | Self::CHeaderPreprocessed)
    }

    /// Temp-file suffix (including the dot) used when this type's output
    /// is placed in a temp file or a derived named output. `None` for
    /// types that are never produced as an intermediate (`Object`'s
    /// suffix is still meaningful as a *derived* name, `Nothing`/`Image`
    /// are handled specially by the binder).
    #[must_use]
    pub const fn temp_suffix(self) -> Option<&'static str> {
        match self {
            Self::CPreprocessed => Some(".i"),
            Self::CxxPreprocessed => Some(".ii"),
            Self::ObjCPreprocessed => Some(".mi"),
            Self::ObjCxxPreprocessed => Some(".mii"),
            Self::AsmNoPP => Some(".s"),
            Self::Object => Some(".o"),
            Self::CHeaderPreprocessed => Some(".i"),
            Self::PCH => Some(".gch"),
            _ => None,
        }
    }
}

/// Classify an input path by its filename suffix.
///
/// Returns `None` only for paths with no recognized suffix at all; per
/// spec, callers fall back to [`FileType::Object`] in that case (this
/// function does not perform that fallback itself, so callers can
/// distinguish "no suffix recognized" from "explicitly object").
#[must_use]
pub fn classify_by_suffix(path: &str) -> Option<FileType> {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
    Some(match ext {
        "c" => FileType::C,
        "i" => FileType::CPreprocessed,
        "cc" | "cp" | "cxx" | "cpp" | "CPP" | "c++" | "C" => FileType::Cxx,
        "ii" => FileType::CxxPreprocessed,
        "m" => FileType::ObjC,
        "mi" => FileType::ObjCPreprocessed,
        "mm" | "M" => FileType::ObjCxx,
        "mii" => FileType::ObjCxxPreprocessed,
        "s" => FileType::AsmNoPP,
        "S" => FileType::Asm,
        "ll" | "bc" => FileType::LLVMIr,
        "o" | "a" | "so" | "dylib" => FileType::Object,
        "h" => FileType::CHeader,
        "gch" | "pch" => FileType::PCH,
        _ => return None,
    })
}

/// Classify an `-x <specifier>` language name.
///
/// Returns `None` for an unrecognized specifier; the
/// caller emits a warning and falls back to [`FileType::Object`].
#[must_use]
pub fn classify_by_specifier(name: &str) -> Option<FileType> {
    Some(match name {
        "c" => FileType::C,
        "cpp-output" => FileType::CPreprocessed,
        "c++" => FileType::Cxx,
        "c++-cpp-output" => FileType::CxxPreprocessed,
        "objective-c" => FileType::ObjC,
        "objective-c-cpp-output" => FileType::ObjCPreprocessed,
        "objective-c++" => FileType::ObjCxx,
        "objective-c++-cpp-output" => FileType::ObjCxxPreprocessed,
        "assembler" => FileType::AsmNoPP,
        "assembler-with-cpp" => FileType::Asm,
        "c-header" => FileType::CHeader,
        "c-header-cpp-output" => FileType::CHeaderPreprocessed,
        "ir" => FileType::LLVMIr,
        "none" => return None,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_classification_covers_c_family() {
        assert_eq!(classify_by_suffix("foo.c"), Some(FileType::C));
        assert_eq!(classify_by_suffix("foo.cpp"), Some(FileType::Cxx));
        assert_eq!(classify_by_suffix("foo.s"), Some(FileType::AsmNoPP));
        assert_eq!(classify_by_suffix("foo.S"), Some(FileType::Asm));
        assert_eq!(classify_by_suffix("foo.o"), Some(FileType::Object));
    }

    #[test]
    fn suffix_classification_unknown_suffix_is_none() {
        assert_eq!(classify_by_suffix("foo.xyz"), None);
        assert_eq!(classify_by_suffix("foo"), None);
    }

    #[test]
    fn specifier_none_falls_back_like_unknown() {
        // "-x none" disables any override; callers treat this the same as
        // an unrecognized specifier (fall back to suffix-derived typing).
        assert_eq!(classify_by_specifier("none"), None);
        assert_eq!(classify_by_specifier("bogus"), None);
    }

    #[test]
    fn preprocess_target_round_trips_to_preprocessed_sibling() {
        assert_eq!(FileType::C.preprocess_target(), Some(FileType::CPreprocessed));
        assert!(FileType::C.needs_preprocess());
        assert!(!FileType::CPreprocessed.needs_preprocess());
        assert!(!FileType::Object.needs_preprocess());
    }

    #[test]
    fn only_assemble_covers_both_asm_variants() {
        assert!(FileType::AsmNoPP.only_assemble());
        assert!(FileType::Asm.only_assemble());
        assert!(!FileType::C.only_assemble());
    }

    #[test]
    fn header_classifies_as_precompile_only() {
        assert_eq!(classify_by_suffix("foo.h"), Some(FileType::CHeader));
        assert!(FileType::CHeader.only_precompile());
        assert_eq!(
            FileType::CHeader.preprocess_target(),
            Some(FileType::CHeaderPreprocessed)
        );
        assert!(FileType::CHeaderPreprocessed.only_precompile());
        assert!(!FileType::CHeaderPreprocessed.needs_preprocess());
    }
}
