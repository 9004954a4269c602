use crate::jpeg2000::bit_io::J2kBitWriter;

/// Tag Tree for JPEG 2000 Packet Header coding.
/// Represents a quad-tree structure used to encode 2D arrays of values (e.g. inclusion, zero bit-planes).
pub struct TagTree {
    nodes: Vec<TagTreeNode>,
    leaf_width: usize,
    leaf_height: usize,
}

#[derive(Clone, Debug)]
struct TagTreeNode {
    value: i32,
    low: i32,
    known: bool,
    parent_index: Option<usize>,
}

impl Default for TagTreeNode {
    fn default() -> Self {
        Self {
            value: i32::MAX,
            low: 0,
            known: false,
            parent_index: None,
        }
    }
}

impl TagTree {
    /// Create a new TagTree for a grid of `w` x `h` leaves.
    pub fn new(w: usize, h: usize) -> Self {
        let mut nodes = vec![TagTreeNode::default(); w * h];
        let mut level_start = 0;
        let (mut level_w, mut level_h) = (w, h);

        while level_w > 1 || level_h > 1 {
            let next_w = level_w.div_ceil(2);
            let next_h = level_h.div_ceil(2);
            let next_start = nodes.len();
            nodes.resize(next_start + next_w * next_h, TagTreeNode::default());

            for y in 0..level_h {
                for x in 0..level_w {
                    let parent = next_start + (y / 2) * next_w + x / 2;
                    nodes[level_start + y * level_w + x].parent_index = Some(parent);
                }
            }

            level_start = next_start;
            level_w = next_w;
            level_h = next_h;
        }

        Self {
            nodes,
            leaf_width: w,
            leaf_height: h,
        }
    }

    /// Set the value at a leaf coordinate (x, y). Ancestors keep the minimum
    /// of their subtree.
    pub fn set_value(&mut self, x: usize, y: usize, value: i32) {
        if x >= self.leaf_width || y >= self.leaf_height {
            return;
        }
        let mut idx = y * self.leaf_width + x;
        self.nodes[idx].value = value;
        while let Some(parent) = self.nodes[idx].parent_index {
            if self.nodes[parent].value <= value {
                break;
            }
            self.nodes[parent].value = value;
            idx = parent;
        }
    }

    /// Encode the value for leaf at (x, y) up to `threshold`.
    ///
    /// A 0 bit raises the running lower bound, a 1 bit marks the node's
    /// value as reached. Nodes shared with earlier leaves only emit the bits
    /// not already sent.
    pub fn encode(&mut self, writer: &mut J2kBitWriter, x: usize, y: usize, threshold: i32) {
        if x >= self.leaf_width || y >= self.leaf_height {
            return;
        }

        let mut path = Vec::new();
        let mut idx = Some(y * self.leaf_width + x);
        while let Some(i) = idx {
            path.push(i);
            idx = self.nodes[i].parent_index;
        }

        let mut low = 0;
        for &i in path.iter().rev() {
            let node = &mut self.nodes[i];
            if low > node.low {
                node.low = low;
            } else {
                low = node.low;
            }

            while low < threshold {
                if low >= node.value {
                    if !node.known {
                        writer.write_bit(1);
                        node.known = true;
                    }
                    break;
                }
                writer.write_bit(0);
                low += 1;
            }
            node.low = low;
        }
    }
}
