//! Fixture programs shared by the unit tests.

pub const POINT_NO_EXT: &str = concat!(
    "P[1]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   100.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =     0.000 deg,\tP =     0.000 deg,\tR =     0.000 deg\r\n",
    "};\r\n",
);

pub const POINT_EXT: &str = concat!(
    "P[3]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 2,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =  1200.500  mm,\tY =  -350.250  mm,\tZ =   800.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1500.000  mm\r\n",
    "};\r\n",
);

pub const POINT_JOINT: &str = concat!(
    "P[2]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\r\n",
    "\tJ1=     0.000 deg,\tJ2=   -15.000 deg,\tJ3=    10.000 deg,\r\n",
    "\tJ4=     0.000 deg,\tJ5=   -90.000 deg,\tJ6=     0.000 deg\r\n",
    "};\r\n",
);

pub const SAMPLE_PROGRAM: &str = concat!(
    "/PROG  SAMPLE\r\n",
    "/ATTR\r\n",
    "OWNER\t\t= MNEDITOR;\r\n",
    "COMMENT\t\t= \"Door panel\";\r\n",
    "PROG_SIZE\t= 2236;\r\n",
    "CREATE\t\t= DATE 15-03-10  TIME 09:12:44;\r\n",
    "MODIFIED\t= DATE 15-03-12  TIME 10:22:33;\r\n",
    "FILE_NAME\t= ;\r\n",
    "VERSION\t\t= 0;\r\n",
    "LINE_COUNT\t= 11;\r\n",
    "MEMORY_SIZE\t= 2600;\r\n",
    "PROTECT\t\t= READ_WRITE;\r\n",
    "TCD:  STACK_SIZE\t= 0,\r\n",
    "      TASK_PRIORITY\t= 50,\r\n",
    "      TIME_SLICE\t= 0,\r\n",
    "      BUSY_LAMP_OFF\t= 0,\r\n",
    "      ABORT_REQUEST\t= 0,\r\n",
    "      PAUSE_REQUEST\t= 0;\r\n",
    "DEFAULT_GROUP\t= 1,*,*,*,*;\r\n",
    "CONTROL_CODE\t= 00000000 00000000;\r\n",
    "PAINT_PROCESS;\r\n",
    "  START_COLOR\t= 1;\r\n",
    "  GUN_SELECT\t= 1;\r\n",
    "\r\n",
    "/APPL\r\n",
    "  PAINT_PROCESS_HEADER;\r\n",
    "\r\n",
    "/MN\r\n",
    "   1:  UFRAME_NUM=1 ;\r\n",
    "   2:  UTOOL_NUM=1 ;\r\n",
    "   3:J P[1] 100% FINE    ;\r\n",
    "   4:L P[2] 500mm/sec CNT100    ;\r\n",
    "   5:  Preset[3] ;\r\n",
    "   6:L P[3] 800mm/sec CNT100    ;\r\n",
    "   7:C P[4]    \r\n",
    "    :  P[5] 300mm/sec CNT50    ;\r\n",
    "   8:L P[6] 600mm/sec CNT100    ;\r\n",
    "   9:L P[7] 650mm/sec FINE    ;\r\n",
    "  10:  CALL GUN_OFF ;\r\n",
    "/POS\r\n",
    "P[1]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   100.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1000.000  mm\r\n",
    "};\r\n",
    "P[2]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   150.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1000.000  mm\r\n",
    "};\r\n",
    "P[3]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   200.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1010.000  mm\r\n",
    "};\r\n",
    "P[4]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   300.000  mm,\tY =   250.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1020.000  mm\r\n",
    "};\r\n",
    "P[5]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   400.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1030.000  mm\r\n",
    "};\r\n",
    "P[6]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   500.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1040.000  mm\r\n",
    "};\r\n",
    "P[7]{\r\n",
    "   GP1:\r\n",
    "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
    "\tX =   600.000  mm,\tY =   200.000  mm,\tZ =   300.000  mm,\r\n",
    "\tW =   -90.000 deg,\tP =     0.000 deg,\tR =   180.000 deg,\r\n",
    "\tE1=  1050.000  mm\r\n",
    "};\r\n",
    "/END\r\n",
);

/// A program with one linear move per point, points numbered from 1 and
/// spaced 100 mm apart along X.
pub fn linear_program(speeds: &[i32]) -> String {
    let mut text = String::from(concat!(
        "/PROG  STRIPE\r\n",
        "/ATTR\r\n",
        "COMMENT\t\t= \"Stripe\";\r\n",
        "/MN\r\n",
    ));
    for (i, speed) in speeds.iter().enumerate() {
        text += &format!("{:>4}:L P[{}] {}mm/sec CNT100    ;\r\n", i + 1, i + 1, speed);
    }
    text += "/POS\r\n";
    for i in 0..speeds.len() {
        text += &format!(
            concat!(
                "P[{}]{{\r\n",
                "   GP1:\r\n",
                "\tUF : 1, UT : 1,\t\tCONFIG : 'N U T, 0, 0, 0',\r\n",
                "\tX = {:>9.3}  mm,\tY =     0.000  mm,\tZ =   500.000  mm,\r\n",
                "\tW =   180.000 deg,\tP =     0.000 deg,\tR =     0.000 deg\r\n",
                "}};\r\n",
            ),
            i + 1,
            (i * 100) as f64
        );
    }
    text + "/END\r\n"
}
