use super::bit_io::J2kBitWriter;
use super::ht_block_coder::HtCodedBlock;
use super::tag_tree::TagTree;
use crate::params::ProgressionOrder;

/// Initial number of bits used to signal a code-block length.
const LBLOCK_INITIAL: u32 = 3;

/// Code-blocks of one subband that fall inside a precinct, raster order.
#[derive(Debug, Clone, Default)]
pub struct PrecinctBand {
    pub blocks_wide: usize,
    pub blocks_high: usize,
    pub blocks: Vec<HtCodedBlock>,
}

impl PrecinctBand {
    fn is_empty(&self) -> bool {
        self.blocks.iter().all(HtCodedBlock::is_empty)
    }
}

/// Writes the single-layer packet of one precinct: header followed by the
/// bodies of every included code-block.
///
/// A precinct without any coded block produces the one-byte empty packet.
pub fn encode_packet(bands: &[PrecinctBand]) -> Vec<u8> {
    if bands.iter().all(PrecinctBand::is_empty) {
        return vec![0x00];
    }

    let mut header = J2kBitWriter::new();
    header.write_bit(1);

    for band in bands {
        if band.blocks.is_empty() {
            continue;
        }
        let mut inclusion = TagTree::new(band.blocks_wide, band.blocks_high);
        let mut zero_bp = TagTree::new(band.blocks_wide, band.blocks_high);
        for (i, block) in band.blocks.iter().enumerate() {
            let (x, y) = (i % band.blocks_wide, i / band.blocks_wide);
            if !block.is_empty() {
                inclusion.set_value(x, y, 0);
                zero_bp.set_value(x, y, block.zero_bit_planes as i32);
            }
        }

        for (i, block) in band.blocks.iter().enumerate() {
            let (x, y) = (i % band.blocks_wide, i / band.blocks_wide);
            inclusion.encode(&mut header, x, y, 1);
            if block.is_empty() {
                continue;
            }
            zero_bp.encode(&mut header, x, y, i32::MAX);
            write_pass_count(&mut header, block.passes);
            write_length(&mut header, block.data.len() as u32, block.passes);
        }
    }

    let mut packet = header.finish();
    for block in bands.iter().flat_map(|b| b.blocks.iter()) {
        packet.extend_from_slice(&block.data);
    }
    packet
}

/// Number of coding passes (Table B.4). Only the 1 and 2 pass codes are
/// ever needed by the cleanup-only block coder.
fn write_pass_count(writer: &mut J2kBitWriter, passes: u8) {
    match passes {
        1 => writer.write_bit(0),
        _ => writer.write_bits(0b10, 2),
    }
}

/// Code-block length with the Lblock increment signalling (B.10.7.1).
fn write_length(writer: &mut J2kBitWriter, length: u32, passes: u8) {
    let pass_bits = u32::from(passes).ilog2();
    let needed = (32 - length.leading_zeros()).max(1);
    let increment = needed.saturating_sub(LBLOCK_INITIAL + pass_bits);
    for _ in 0..increment {
        writer.write_bit(1);
    }
    writer.write_bit(0);
    writer.write_bits(length, (LBLOCK_INITIAL + increment + pass_bits) as u8);
}

/// One packet of the (single-layer) tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketId {
    pub component: usize,
    pub resolution: usize,
    pub precinct: usize,
    /// Origin of the precinct on the reference grid.
    pub x: u64,
    pub y: u64,
}

/// Sorts `packets` into the order prescribed by `order`.
///
/// With one tile anchored at the origin and no subsampling, each order is a
/// lexicographic ordering over (resolution, component, precinct) or over
/// precinct positions on the reference grid.
pub fn sort_packets(packets: &mut [PacketId], order: ProgressionOrder) {
    match order {
        // One layer: LRCP and RLCP coincide.
        ProgressionOrder::Lrcp | ProgressionOrder::Rlcp => {
            packets.sort_by_key(|p| (p.resolution, p.component, p.precinct))
        }
        ProgressionOrder::Rpcl => packets.sort_by_key(|p| (p.resolution, p.y, p.x, p.component)),
        ProgressionOrder::Pcrl => packets.sort_by_key(|p| (p.y, p.x, p.component, p.resolution)),
        ProgressionOrder::Cprl => packets.sort_by_key(|p| (p.component, p.y, p.x, p.resolution)),
    }
}
