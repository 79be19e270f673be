//! Hand-assembled FDT blobs for integration tests.
//!
//! The retrieval pack this crate was built from did not carry `.dtb`
//! binary fixtures, so every test blob here is built up byte-by-byte
//! instead of loaded from disk.

use std::sync::Once;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
    });
}

fn pad4(mut v: Vec<u8>) -> Vec<u8> {
    while v.len() % 4 != 0 {
        v.push(0);
    }
    v
}

/// A small builder for a structure + strings block pair, used to
/// assemble a full FDT blob without hand-computing byte offsets.
pub struct Builder {
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: Vec<(String, u32)>,
    mem_reservations: Vec<(u64, u64)>,
    boot_cpuid_phys: u32,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            structure: Vec::new(),
            strings: Vec::new(),
            string_offsets: Vec::new(),
            mem_reservations: Vec::new(),
            boot_cpuid_phys: 0,
        }
    }

    pub fn boot_cpuid_phys(mut self, id: u32) -> Self {
        self.boot_cpuid_phys = id;
        self
    }

    pub fn mem_reservation(mut self, address: u64, size: u64) -> Self {
        self.mem_reservations.push((address, size));
        self
    }

    fn name_offset(&mut self, name: &str) -> u32 {
        if let Some((_, off)) = self.string_offsets.iter().find(|(n, _)| n == name) {
            return *off;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.push((name.to_string(), off));
        off
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.structure.extend(1u32.to_be_bytes());
        self.structure
            .extend(pad4(format!("{name}\0").into_bytes()));
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.structure.extend(2u32.to_be_bytes());
        self
    }

    pub fn prop(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        let nameoff = self.name_offset(name);
        self.structure.extend(3u32.to_be_bytes());
        self.structure.extend((payload.len() as u32).to_be_bytes());
        self.structure.extend(nameoff.to_be_bytes());
        self.structure.extend(pad4(payload.to_vec()));
        self
    }

    pub fn prop_string(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes)
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    pub fn build(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        structure.extend(9u32.to_be_bytes()); // FDT_END

        let header_size = 40usize;
        let mem_rsvmap_offset = header_size;
        let mem_rsvmap_size = (self.mem_reservations.len() + 1) * 16;
        let struct_offset = mem_rsvmap_offset + mem_rsvmap_size;
        let strings_offset = struct_offset + structure.len();
        let total = strings_offset + self.strings.len();

        let mut blob = vec![0u8; total];
        blob[0..4].copy_from_slice(&0xd00d_feedu32.to_be_bytes());
        blob[4..8].copy_from_slice(&(total as u32).to_be_bytes());
        blob[8..12].copy_from_slice(&(struct_offset as u32).to_be_bytes());
        blob[12..16].copy_from_slice(&(strings_offset as u32).to_be_bytes());
        blob[16..20].copy_from_slice(&(mem_rsvmap_offset as u32).to_be_bytes());
        blob[20..24].copy_from_slice(&17u32.to_be_bytes());
        blob[24..28].copy_from_slice(&16u32.to_be_bytes());
        blob[28..32].copy_from_slice(&self.boot_cpuid_phys.to_be_bytes());
        blob[32..36].copy_from_slice(&(self.strings.len() as u32).to_be_bytes());
        blob[36..40].copy_from_slice(&(structure.len() as u32).to_be_bytes());

        let mut cursor = mem_rsvmap_offset;
        for (addr, size) in &self.mem_reservations {
            blob[cursor..cursor + 8].copy_from_slice(&addr.to_be_bytes());
            blob[cursor + 8..cursor + 16].copy_from_slice(&size.to_be_bytes());
            cursor += 16;
        }
        blob[cursor..cursor + 16].copy_from_slice(&[0u8; 16]);

        blob[struct_offset..struct_offset + structure.len()].copy_from_slice(&structure);
        blob[strings_offset..strings_offset + self.strings.len()].copy_from_slice(&self.strings);
        blob
    }
}
