// Configuration structure for column name mapping
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub segid: String,
    pub drainage_area: String,
    pub slope: String,
    pub qlow: String,
    pub q2: String,
    pub sp_low: String,
    pub sp2: String,
}

impl ColumnConfig {
    pub fn new() -> Self {
        ColumnConfig {
            segid: "SegID".to_string(),
            drainage_area: "iGeo_DA".to_string(),
            slope: "iGeo_Slope".to_string(),
            qlow: "iHyd_QLow".to_string(),
            q2: "iHyd_Q2".to_string(),
            sp_low: "iHyd_SPLow".to_string(),
            sp2: "iHyd_SP2".to_string(),
        }
    }
}
