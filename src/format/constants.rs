//! Tag kinds, block kinds and enumerated values used by this crate

// File structure
/// File identifier
pub const FIFF_FILE_ID: i32 = 100;
/// Position of the directory tag
pub const FIFF_DIR_POINTER: i32 = 101;
/// Directory
pub const FIFF_DIR: i32 = 102;
/// Block identifier
pub const FIFF_BLOCK_ID: i32 = 103;
/// Start of a block
pub const FIFF_BLOCK_START: i32 = 104;
/// End of a block
pub const FIFF_BLOCK_END: i32 = 105;
/// Free list
pub const FIFF_FREE_LIST: i32 = 106;
/// Free block
pub const FIFF_FREE_BLOCK: i32 = 107;
/// No-op tag
pub const FIFF_NOP: i32 = 108;
/// Parent file identifier
pub const FIFF_PARENT_FILE_ID: i32 = 109;
/// Parent block identifier
pub const FIFF_PARENT_BLOCK_ID: i32 = 110;

// Measurement
/// Channel information
pub const FIFF_CH_INFO: i32 = 203;
/// Digitization point
pub const FIFF_DIG_POINT: i32 = 213;
/// Coordinate transformation
pub const FIFF_COORD_TRANS: i32 = 222;

// BEM
/// Surface identifier
pub const FIFF_BEM_SURF_ID: i32 = 3101;
/// Surface name
pub const FIFF_BEM_SURF_NAME: i32 = 3102;
/// Number of nodes
pub const FIFF_BEM_SURF_NNODE: i32 = 3103;
/// Number of triangles
pub const FIFF_BEM_SURF_NTRI: i32 = 3104;
/// Node coordinates
pub const FIFF_BEM_SURF_NODES: i32 = 3105;
/// Triangle vertex indices (one-based)
pub const FIFF_BEM_SURF_TRIANGLES: i32 = 3106;
/// Node normals
pub const FIFF_BEM_SURF_NORMALS: i32 = 3107;
/// Compartment conductivity
pub const FIFF_BEM_SIGMA: i32 = 3113;
/// Coordinate frame of MNE data
pub const FIFF_MNE_COORD_FRAME: i32 = 3506;

/// BEM block
pub const FIFFB_BEM: i32 = 310;
/// BEM surface block
pub const FIFFB_BEM_SURF: i32 = 311;

/// Next tag follows sequentially
pub const FIFFV_NEXT_SEQ: i32 = 0;
/// End of the tag chain
pub const FIFFV_NEXT_NONE: i32 = -1;

/// Unknown coordinate frame
pub const FIFFV_COORD_UNKNOWN: i32 = 0;
/// MEG device frame
pub const FIFFV_COORD_DEVICE: i32 = 1;
/// Head frame
pub const FIFFV_COORD_HEAD: i32 = 4;
/// MRI frame
pub const FIFFV_COORD_MRI: i32 = 5;

/// MEG channel
pub const FIFFV_MEG_CH: i32 = 1;
/// EEG channel
pub const FIFFV_EEG_CH: i32 = 2;
/// Reference MEG channel
pub const FIFFV_REF_MEG_CH: i32 = 301;

/// Surface of unknown kind
pub const FIFFV_MNE_SURF_UNKNOWN: i32 = -1;
/// Inner skull / brain surface
pub const FIFFV_BEM_SURF_ID_BRAIN: i32 = 1;
/// Outer skull surface
pub const FIFFV_BEM_SURF_ID_SKULL: i32 = 3;
/// Scalp surface
pub const FIFFV_BEM_SURF_ID_HEAD: i32 = 4;

/// Version written into file identifiers (1.3)
pub const FIFFC_VERSION: i32 = (1 << 16) | 3;
