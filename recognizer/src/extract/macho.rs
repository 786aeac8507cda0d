//! Mach-O text-section and fat-slice location.

use super::{bounded_region, fixed_name, read_u32, read_u64, Region};

const LC_SEGMENT: u32 = 0x1;
const LC_SEGMENT_64: u32 = 0x19;

/// File offsets of the `__TEXT,__text` section(s) of a thin Mach-O.
pub(super) fn text_regions(data: &[u8], bits64: bool, big_endian: bool) -> Option<Vec<Region>> {
    let little_endian = !big_endian;
    let header_size = if bits64 { 32 } else { 28 };
    let ncmds = read_u32(data, 16, little_endian)? as usize;

    let mut regions = Vec::new();
    let mut cursor = header_size;
    for _ in 0..ncmds {
        let cmd = read_u32(data, cursor, little_endian)?;
        let cmdsize = read_u32(data, cursor + 4, little_endian)? as usize;
        if cmdsize < 8 {
            return None;
        }
        let is_seg64 = cmd == LC_SEGMENT_64;
        if cmd == LC_SEGMENT || is_seg64 {
            let segname = fixed_name(data.get(cursor + 8..cursor + 24)?);
            if segname == "__TEXT" {
                let (nsects_off, sect_base, sect_size) = if is_seg64 {
                    (64, 72, 80)
                } else {
                    (48, 56, 68)
                };
                let nsects = read_u32(data, cursor + nsects_off, little_endian)? as usize;
                for i in 0..nsects {
                    let base = cursor + sect_base + i * sect_size;
                    let sectname = fixed_name(data.get(base..base + 16)?);
                    if sectname != "__text" {
                        continue;
                    }
                    let (size, offset) = if is_seg64 {
                        (
                            read_u64(data, base + 40, little_endian)? as usize,
                            read_u32(data, base + 48, little_endian)? as usize,
                        )
                    } else {
                        (
                            read_u32(data, base + 36, little_endian)? as usize,
                            read_u32(data, base + 40, little_endian)? as usize,
                        )
                    };
                    if let Some(region) =
                        bounded_region(data, offset, size, "Mach-O __text".to_string())
                    {
                        regions.push(region);
                    }
                }
            }
        }
        cursor += cmdsize;
    }
    Some(regions)
}

/// One region per architecture slice of a fat/universal binary.
///
/// The slices are whole Mach-O images, not text sections; the sliding
/// window takes it from there. Slice order follows the fat header.
pub(super) fn fat_slices(data: &[u8]) -> Option<Vec<Region>> {
    // The fat header is always big-endian.
    let nfat = read_u32(data, 4, false)? as usize;
    let mut regions = Vec::new();
    for i in 0..nfat {
        let base = 8 + i * 20;
        let cpu_type = read_u32(data, base, false)?;
        let offset = read_u32(data, base + 8, false)? as usize;
        let size = read_u32(data, base + 12, false)? as usize;
        let kind = format!("Mach-O slice ({})", cpu_type_name(cpu_type));
        if let Some(region) = bounded_region(data, offset, size, kind) {
            regions.push(region);
        }
    }
    Some(regions)
}

fn cpu_type_name(cpu_type: u32) -> String {
    match cpu_type {
        7 => "i386".into(),
        0x0100_0007 => "x86_64".into(),
        12 => "arm".into(),
        0x0100_000C => "arm64".into(),
        18 => "ppc".into(),
        0x0100_0012 => "ppc64".into(),
        other => format!("cputype {other:#x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal 64-bit little-endian Mach-O with one __TEXT,__text section.
    fn sample_macho() -> Vec<u8> {
        let mut data = vec![0u8; 0x800];
        data[0..4].copy_from_slice(&[0xCF, 0xFA, 0xED, 0xFE]);
        data[16..20].copy_from_slice(&1u32.to_le_bytes()); // ncmds

        let cmd = 32;
        data[cmd..cmd + 4].copy_from_slice(&LC_SEGMENT_64.to_le_bytes());
        data[cmd + 4..cmd + 8].copy_from_slice(&(72u32 + 80).to_le_bytes());
        data[cmd + 8..cmd + 14].copy_from_slice(b"__TEXT");
        data[cmd + 64..cmd + 68].copy_from_slice(&1u32.to_le_bytes()); // nsects

        let sect = cmd + 72;
        data[sect..sect + 6].copy_from_slice(b"__text");
        data[sect + 16..sect + 22].copy_from_slice(b"__TEXT");
        data[sect + 40..sect + 48].copy_from_slice(&0x200u64.to_le_bytes()); // size
        data[sect + 48..sect + 52].copy_from_slice(&0x400u32.to_le_bytes()); // offset
        data
    }

    #[test]
    fn test_locates_text_section() {
        let regions = text_regions(&sample_macho(), true, false).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].offset, 0x400);
        assert_eq!(regions[0].len, 0x200);
    }

    #[test]
    fn test_fat_slices() {
        let mut data = vec![0u8; 0x1000];
        data[0..4].copy_from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]);
        data[4..8].copy_from_slice(&2u32.to_be_bytes());
        // Slice 0: ppc at 0x100, 0x200 bytes.
        data[8..12].copy_from_slice(&18u32.to_be_bytes());
        data[16..20].copy_from_slice(&0x100u32.to_be_bytes());
        data[20..24].copy_from_slice(&0x200u32.to_be_bytes());
        // Slice 1: i386 at 0x800, 0x300 bytes.
        data[28..32].copy_from_slice(&7u32.to_be_bytes());
        data[36..40].copy_from_slice(&0x800u32.to_be_bytes());
        data[40..44].copy_from_slice(&0x300u32.to_be_bytes());

        let regions = fat_slices(&data).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, "Mach-O slice (ppc)");
        assert_eq!(regions[0].offset, 0x100);
        assert_eq!(regions[1].kind, "Mach-O slice (i386)");
        assert_eq!(regions[1].len, 0x300);
    }

    #[test]
    fn test_truncated_macho_is_none() {
        assert_eq!(text_regions(&[0xCF, 0xFA, 0xED, 0xFE], true, false), None);
    }
}
