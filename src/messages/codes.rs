// Message codes referenced from code. Templates live in system_messages.

// Users
pub const USER_REGISTERED: &str = "MOD_U_OK_REGISTERED";
pub const USER_DUPLICATE: &str = "MOD_U_DUP_ERR_00001";
pub const USER_CANNOT_SAVE: &str = "MOD_U_SAVE_ERR_00002";
pub const USER_NOT_FOUND: &str = "MOD_U_GET_ERR_00003";
pub const USER_EMAIL_NOT_FOUND: &str = "MOD_U_EMAIL_NF_ERR_00005";
pub const USER_EMAIL_NOT_VERIFIED: &str = "MOD_U_EMAIL_NV_ERR_00006";
pub const USER_TOKEN_NOT_FOUND: &str = "MOD_U_TOKEN_NF_ERR_00007";
pub const USER_TOKEN_EXPIRED: &str = "MOD_U_TOKEN_EXP_ERR_00008";
pub const USER_TOKEN_USED: &str = "MOD_U_TOKEN_USED_ERR_00009";

// Validation
pub const VAL_BAD_FORMAT: &str = "MOD_V_VAL_ERR_00001";
pub const VAL_INVALID_REQUEST: &str = "MOD_V_VAL_ERR_00002";
pub const VAL_FAILED: &str = "MOD_V_VAL_ERR_00006";
pub const VAL_FIELD_FORMAT: &str = "MOD_V_VAL_ERR_00008";
pub const VAL_FIELD_REQUIRED: &str = "MOD_V_VAL_ERR_00009";
pub const VAL_FIELD_TYPE: &str = "MOD_V_VAL_ERR_00010";
pub const VAL_MULTIPLE: &str = "MOD_V_VAL_ERR_00011";
pub const VAL_JSON_INVALID: &str = "MOD_V_JSON_ERR_00012";
pub const VAL_ID_INVALID: &str = "MOD_V_ID_ERR_00013";
pub const VAL_START_AFTER_END: &str = "MOD_V_DATE_ERR_00017";
pub const VAL_DATE_FORMAT: &str = "MOD_V_DATE_ERR_00018";

// Identity provider
pub const KC_INVALID_TOKEN: &str = "MOD_KC_INVALID_TOKEN_ERR_00001";
pub const KC_USER_NOT_FOUND: &str = "MOD_KC_USER_NOT_FOUND_ERR_00001";
pub const KC_LOGIN_SUCCESS: &str = "MOD_KC_LOGIN_SUCCESS_EXI_00001";
pub const KC_VERIF_EMAIL_SENT: &str = "MOD_KC_VERIF_EMAIL_SENT_EXI_00001";
pub const KC_PWD_RESET_SENT: &str = "MOD_KC_PWD_RESET_SENT_EXI_00001";
pub const KC_EMAIL_ALREADY_VERIFIED: &str = "MOD_KC_EMAIL_ALREADY_VERIFIED_WARN_00001";

// Routing
pub const ROUTE_NOT_FOUND: &str = "MOD_M_NOT_FOUND_ERR_00001";

// Authorization
pub const ROLE_NOT_FOUND: &str = "MOD_A_ROLE_NF_ERR_00005";

// Infrastructure
pub const INFRA_IDP_UNAVAILABLE: &str = "MOD_INFRA_KC_UNAVAIL_ERR_00004";
pub const INFRA_DB_UNAVAILABLE: &str = "MOD_INFRA_DB_UNAVAIL_ERR_00005";
pub const INFRA_DEPENDENCY_FAILED: &str = "MOD_INFRA_DEP_FAIL_ERR_00006";
pub const INFRA_INCOMPLETE_REGISTRATION: &str = "MOD_INFRA_INCOMPLETE_REG_ERR_00009";

// General
pub const GEN_SERVER_ERROR: &str = "GEN_SRV_ERR_00001";
pub const GEN_UNAUTHORIZED: &str = "GEN_AUTH_ERR_00002";
pub const GEN_FORBIDDEN: &str = "GEN_FORBIDDEN_ERR_00003";
pub const GEN_TIMEOUT: &str = "GEN_TIMEOUT_ERR_00004";
pub const GEN_OPERATION_OK: &str = "GEN_OPE_EXI_00001";
